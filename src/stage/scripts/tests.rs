use super::*;
use crate::stage::testing::Fixture;

fn fixture_with_modules() -> Fixture {
    let fx = Fixture::new();
    fx.write(
        "src/js/scripts.js",
        r#"import { greet } from "./lib/greet";
import * as math from "./lib/math.js";
import banner from "./banner";

console.log(greet("visitor"), math.square(3), banner);
"#,
    );
    fx.write(
        "src/js/lib/greet.js",
        "export const greet = (name) => `hello from kiln, ${name}`;\n",
    );
    fx.write(
        "src/js/lib/math.js",
        "export function square(x) { return x ** 2; }\nexport * from \"./consts\";\n",
    );
    fx.write("src/js/lib/consts.js", "export const TAU = 6.283;\n");
    fx.write("src/js/banner/index.js", "export default \"kiln banner\";\n");
    fx
}

#[test]
fn test_bundle_written_with_map() {
    let fx = fixture_with_modules();
    let ctx = BuildContext::new(&fx.config);
    let summary = run(&ctx).unwrap();

    assert_eq!(fx.output_files(), ["js/scripts.min.js", "js/scripts.min.js.map"]);
    assert_eq!(summary.written.len(), 2);

    let js = fx.read("dist/js/scripts.min.js");
    assert!(js.contains("hello from kiln"), "{js}");
    assert!(js.contains("kiln banner"), "{js}");
    assert!(!js.contains("import "), "{js}");
    assert!(js.ends_with("//# sourceMappingURL=scripts.min.js.map\n"));

    let map: serde_json::Value =
        serde_json::from_str(&fx.read("dist/js/scripts.min.js.map")).unwrap();
    assert_eq!(map["version"], 3);
    assert!(!map["mappings"].as_str().unwrap().is_empty());
}

#[test]
fn test_map_names_module_sources() {
    let fx = fixture_with_modules();
    let ctx = BuildContext::new(&fx.config);
    run(&ctx).unwrap();

    let map: serde_json::Value =
        serde_json::from_str(&fx.read("dist/js/scripts.min.js.map")).unwrap();
    let sources: Vec<&str> = map["sources"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s.as_str())
        .collect();
    for name in [
        "src/js/scripts.js",
        "src/js/lib/greet.js",
        "src/js/lib/math.js",
        "src/js/lib/consts.js",
        "src/js/banner/index.js",
    ] {
        assert!(sources.contains(&name), "{name} missing from {sources:?}");
    }

    let greet = sources.iter().position(|s| *s == "src/js/lib/greet.js").unwrap();
    assert_eq!(
        map["sourcesContent"][greet],
        "export const greet = (name) => `hello from kiln, ${name}`;\n"
    );
    assert!(!map["mappings"].as_str().unwrap().trim_matches(';').is_empty());
}

fn bundle_default(fx: &Fixture) -> Bundle {
    bundle(&fx.config.layout().script_entry(), &ScriptsConfig::default(), fx.root()).unwrap()
}

#[test]
fn test_async_function_bundles_with_helper() {
    let fx = Fixture::new();
    fx.write(
        "src/js/scripts.js",
        "async function load(url) {\n  const res = await fetch(url);\n  return res.json();\n}\nload(\"/data.json\").then(console.log);\n",
    );
    let out = bundle_default(&fx);
    assert!(!out.code.contains("async function"), "{}", out.code);
    assert!(out.code.contains("asyncToGenerator"), "{}", out.code);
    assert!(!out.code.contains("@oxc-project"), "{}", out.code);
}

#[test]
fn test_object_spread_bundles_with_helper() {
    let fx = Fixture::new();
    fx.write("src/js/lib/defaults.js", "export const defaults = { theme: \"dark\" };\n");
    fx.write(
        "src/js/scripts.js",
        "import { defaults } from \"./lib/defaults\";\nconst settings = { ...defaults, lang: \"en\" };\nconsole.log(settings);\n",
    );
    let out = bundle_default(&fx);
    assert!(!out.code.contains("..."), "{}", out.code);
    assert!(out.code.contains("objectSpread2"), "{}", out.code);
    assert!(out.code.contains("defineProperty"), "{}", out.code);
}

#[test]
fn test_class_fields_bundle_with_helper() {
    let fx = Fixture::new();
    fx.write(
        "src/js/scripts.js",
        "class Counter {\n  count = 0;\n  #step = 1;\n  inc() { this.count += this.#step; }\n}\nnew Counter().inc();\n",
    );
    let out = bundle_default(&fx);
    assert!(out.code.contains("defineProperty"), "{}", out.code);
    assert!(!out.code.contains("#step"), "{}", out.code);
    assert!(!out.code.contains("@oxc-project"), "{}", out.code);
}

#[test]
fn test_helpers_defined_once_across_modules() {
    let fx = Fixture::new();
    fx.write("src/js/a.js", "export async function a() { await 1; }\n");
    fx.write("src/js/b.js", "export async function b() { await 2; }\n");
    fx.write(
        "src/js/scripts.js",
        "import { a } from \"./a\";\nimport { b } from \"./b\";\na().then(b);\n",
    );
    let config = ScriptsConfig {
        minify: false,
        ..ScriptsConfig::default()
    };
    let out = bundle(&fx.config.layout().script_entry(), &config, fx.root()).unwrap();
    assert_eq!(out.code.matches("function _asyncToGenerator(").count(), 1, "{}", out.code);
    assert_eq!(out.code.matches("var babelHelpers").count(), 1, "{}", out.code);
}

#[test]
fn test_unminified_bundle_is_lowered() {
    let fx = fixture_with_modules();
    let config = ScriptsConfig {
        minify: false,
        ..ScriptsConfig::default()
    };
    let bundle = bundle(&fx.config.layout().script_entry(), &config, fx.root()).unwrap();
    assert!(bundle.code.contains("Math.pow(x, 2)"), "{}", bundle.code);
    assert!(bundle.code.contains("__kiln_m"), "{}", bundle.code);
}

#[test]
fn test_missing_entry_fails() {
    let fx = Fixture::new();
    let ctx = BuildContext::new(&fx.config);
    let err = run(&ctx).unwrap_err();
    assert_eq!(err.stage(), StageId::Scripts);
    assert!(err.to_string().contains("scripts.js"));
}

#[test]
fn test_bare_import_fails_without_output() {
    let fx = Fixture::new();
    fx.write("src/js/scripts.js", "import _ from \"lodash\";\nconsole.log(_);\n");
    let ctx = BuildContext::new(&fx.config);
    let err = run(&ctx).unwrap_err();
    assert!(err.to_string().contains("lodash"));
    assert!(fx.output_files().is_empty());
}

#[test]
fn test_circular_import_fails() {
    let fx = Fixture::new();
    fx.write("src/js/scripts.js", "import \"./a\";\n");
    fx.write("src/js/a.js", "import \"./b\";\n");
    fx.write("src/js/b.js", "import \"./a\";\n");
    let ctx = BuildContext::new(&fx.config);
    let err = run(&ctx).unwrap_err();
    assert!(err.to_string().contains("circular import"), "{err}");
}

#[test]
fn test_syntax_error_names_module() {
    let fx = Fixture::new();
    fx.write("src/js/scripts.js", "import \"./broken\";\n");
    fx.write("src/js/broken.js", "export const = ;\n");
    let ctx = BuildContext::new(&fx.config);
    let err = run(&ctx).unwrap_err();
    assert!(err.to_string().contains("broken.js"), "{err}");
    assert!(fx.output_files().is_empty());
}
