use std::collections::BTreeMap;

use super::report::testing::RecordingSink;
use super::*;
use crate::stage::testing::Fixture;

fn recording() -> (RecordingSink, Reporter) {
    let sink = RecordingSink::default();
    let reporter = Reporter::with_sinks(vec![Box::new(sink.clone())]);
    (sink, reporter)
}

fn snapshot(fixture: &Fixture) -> BTreeMap<String, Vec<u8>> {
    fixture
        .output_files()
        .into_iter()
        .map(|rel| {
            let bytes = std::fs::read(fixture.root().join("dist").join(&rel)).unwrap();
            (rel, bytes)
        })
        .collect()
}

const SITE_STEPS: &[Step] = &[
    Step::halt(StageId::Clean),
    Step::proceed(StageId::Assets),
    Step::halt(StageId::Styles),
    Step::proceed(StageId::Markup),
];

#[test]
fn test_repeated_runs_are_byte_identical() {
    let fixture = Fixture::new();
    fixture.write("src/assets/robots.txt", "User-agent: *\n");
    fixture.write("src/scss/_vars.scss", "$accent: #c33;\n");
    fixture.write(
        "src/scss/main.scss",
        "@use 'vars';\n.nav {\n  .item { color: vars.$accent; user-select: none; }\n}\n",
    );
    fixture.write(
        "src/html/index.html",
        "<!DOCTYPE html>\n<html>\n  <head><link rel=stylesheet href=/css/main.min.css></head>\n  <body>\n    <p class=\"lead intro\">Hi</p>\n  </body>\n</html>\n",
    );

    let (sink, reporter) = recording();
    let ctx = BuildContext::new(&fixture.config);
    let pipeline = Pipeline::new(SITE_STEPS, &reporter);

    let first_report = pipeline.run(&ctx).unwrap();
    assert!(first_report.is_clean());
    let first = snapshot(&fixture);

    fixture.write("dist/stale.html", "left over");
    pipeline.run(&ctx).unwrap();
    let second = snapshot(&fixture);

    assert_eq!(
        first.keys().collect::<Vec<_>>(),
        ["assets/robots.txt", "css/main.min.css", "css/main.min.css.map", "index.html"]
    );
    assert_eq!(first, second);
    assert!(sink.failures.lock().is_empty());
    assert_eq!(sink.succeeded.lock().len(), 2 * SITE_STEPS.len());
}

#[test]
fn test_style_error_halts_with_one_failure() {
    let fixture = Fixture::new();
    fixture.write("src/scss/main.scss", ".a { color: red;\n");
    fixture.write("src/html/index.html", "<p>x</p>");
    fixture.write("src/js/scripts.js", "console.log(1);\n");

    let (sink, reporter) = recording();
    let ctx = BuildContext::new(&fixture.config);
    let err = Pipeline::standard(&reporter).run(&ctx).unwrap_err();

    assert_eq!(err.stage(), StageId::Styles);
    let failures = sink.failures.lock();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].title(), "error in compile-styles");
    assert!(!fixture.exists("dist/css"));
    // later steps never ran
    assert!(!fixture.exists("dist/index.html"));
}

#[test]
fn test_continue_step_failures_do_not_stop_the_run() {
    let fixture = Fixture::new();
    fixture.write("src/images/broken.png", "not a png");
    fixture.write("src/html/index.html", "<p> ok </p>");

    let (sink, reporter) = recording();
    let steps = [Step::proceed(StageId::Images), Step::proceed(StageId::Markup)];
    let ctx = BuildContext::new(&fixture.config);
    let report = Pipeline::new(&steps, &reporter).run(&ctx).unwrap();

    assert!(!report.is_clean());
    assert!(report.continued.is_empty());
    let failures = sink.failures.lock();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].stage, StageId::Images);
    assert_eq!(fixture.read("dist/index.html"), "<p>ok</p>");
}

#[test]
fn test_missing_script_entry_halts_before_markup() {
    let fixture = Fixture::new();
    fixture.write("src/html/index.html", "<p>x</p>");

    let (sink, reporter) = recording();
    let ctx = BuildContext::new(&fixture.config);
    let err = Pipeline::standard(&reporter).run(&ctx).unwrap_err();

    assert_eq!(err.stage(), StageId::Scripts);
    assert_eq!(sink.failures.lock()[0].title(), "error in build-scripts");
    assert!(!fixture.exists("dist/index.html"));
}

#[test]
fn test_default_sequence_policies() {
    let policies: Vec<_> = DEFAULT_SEQUENCE
        .iter()
        .map(|s| (s.stage.name(), s.policy))
        .collect();
    assert_eq!(
        policies,
        [
            ("clean", FailurePolicy::Halt),
            ("copy-assets", FailurePolicy::Continue),
            ("compile-styles", FailurePolicy::Halt),
            ("optimize-images", FailurePolicy::Continue),
            ("build-scripts", FailurePolicy::Halt),
            ("minify-markup", FailurePolicy::Continue),
        ]
    );
}
