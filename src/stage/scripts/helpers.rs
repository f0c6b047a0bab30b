//! Syntax-lowering helpers bundled into the script.
//!
//! The transformer calls helpers through a `babelHelpers` object
//! (`babelHelpers.objectSpread2({}, a)`). The linker defines that object at
//! the top of the bundle with only the helpers the modules reference.

use std::collections::BTreeSet;

const HELPER_OBJECT: &str = "babelHelpers";

struct HelperSource {
    name: &'static str,
    requires: &'static [&'static str],
    code: &'static str,
}

const HELPERS: &[HelperSource] = &[
    HelperSource {
        name: "typeof",
        requires: &[],
        code: r#"function _typeof(o) {
  return _typeof = "function" == typeof Symbol && "symbol" == typeof Symbol.iterator ? function (o) { return typeof o; } : function (o) { return o && "function" == typeof Symbol && o.constructor === Symbol && o !== Symbol.prototype ? "symbol" : typeof o; }, _typeof(o);
}"#,
    },
    HelperSource {
        name: "toPrimitive",
        requires: &["typeof"],
        code: r#"function _toPrimitive(t, r) {
  if ("object" != _typeof(t) || !t) return t;
  var e = t[Symbol.toPrimitive];
  if (void 0 !== e) {
    var i = e.call(t, r || "default");
    if ("object" != _typeof(i)) return i;
    throw new TypeError("@@toPrimitive must return a primitive value.");
  }
  return ("string" === r ? String : Number)(t);
}"#,
    },
    HelperSource {
        name: "toPropertyKey",
        requires: &["typeof", "toPrimitive"],
        code: r#"function _toPropertyKey(t) {
  var i = _toPrimitive(t, "string");
  return "symbol" == _typeof(i) ? i : i + "";
}"#,
    },
    HelperSource {
        name: "defineProperty",
        requires: &["toPropertyKey"],
        code: r#"function _defineProperty(e, r, t) {
  return (r = _toPropertyKey(r)) in e ? Object.defineProperty(e, r, { value: t, enumerable: !0, configurable: !0, writable: !0 }) : e[r] = t, e;
}"#,
    },
    HelperSource {
        name: "ownKeys",
        requires: &[],
        code: r#"function _ownKeys(e, r) {
  var t = Object.keys(e);
  if (Object.getOwnPropertySymbols) {
    var o = Object.getOwnPropertySymbols(e);
    r && (o = o.filter(function (r) { return Object.getOwnPropertyDescriptor(e, r).enumerable; })), t.push.apply(t, o);
  }
  return t;
}"#,
    },
    HelperSource {
        name: "objectSpread2",
        requires: &["ownKeys", "defineProperty"],
        code: r#"function _objectSpread2(e) {
  for (var r = 1; r < arguments.length; r++) {
    var t = null != arguments[r] ? arguments[r] : {};
    r % 2 ? _ownKeys(Object(t), !0).forEach(function (r) { _defineProperty(e, r, t[r]); }) : Object.getOwnPropertyDescriptors ? Object.defineProperties(e, Object.getOwnPropertyDescriptors(t)) : _ownKeys(Object(t)).forEach(function (r) { Object.defineProperty(e, r, Object.getOwnPropertyDescriptor(t, r)); });
  }
  return e;
}"#,
    },
    HelperSource {
        name: "extends",
        requires: &[],
        code: r#"function _extends() {
  return _extends = Object.assign ? Object.assign.bind() : function (n) {
    for (var e = 1; e < arguments.length; e++) {
      var t = arguments[e];
      for (var r in t) ({}).hasOwnProperty.call(t, r) && (n[r] = t[r]);
    }
    return n;
  }, _extends.apply(null, arguments);
}"#,
    },
    HelperSource {
        name: "objectDestructuringEmpty",
        requires: &[],
        code: r#"function _objectDestructuringEmpty(t) {
  if (null == t) throw new TypeError("Cannot destructure " + t);
}"#,
    },
    HelperSource {
        name: "objectWithoutPropertiesLoose",
        requires: &[],
        code: r#"function _objectWithoutPropertiesLoose(r, e) {
  if (null == r) return {};
  var t = {};
  for (var n in r) if ({}.hasOwnProperty.call(r, n)) {
    if (-1 !== e.indexOf(n)) continue;
    t[n] = r[n];
  }
  return t;
}"#,
    },
    HelperSource {
        name: "objectWithoutProperties",
        requires: &["objectWithoutPropertiesLoose"],
        code: r#"function _objectWithoutProperties(e, t) {
  if (null == e) return {};
  var o, r, i = _objectWithoutPropertiesLoose(e, t);
  if (Object.getOwnPropertySymbols) {
    var n = Object.getOwnPropertySymbols(e);
    for (r = 0; r < n.length; r++) o = n[r], -1 === t.indexOf(o) && {}.propertyIsEnumerable.call(e, o) && (i[o] = e[o]);
  }
  return i;
}"#,
    },
    HelperSource {
        name: "asyncGeneratorStep",
        requires: &[],
        code: r#"function _asyncGeneratorStep(n, t, e, r, o, a, c) {
  try {
    var i = n[a](c), u = i.value;
  } catch (n) {
    return void e(n);
  }
  i.done ? t(u) : Promise.resolve(u).then(r, o);
}"#,
    },
    HelperSource {
        name: "asyncToGenerator",
        requires: &["asyncGeneratorStep"],
        code: r#"function _asyncToGenerator(n) {
  return function () {
    var t = this, e = arguments;
    return new Promise(function (r, o) {
      var a = n.apply(t, e);
      function _next(n) { _asyncGeneratorStep(a, r, o, _next, _throw, "next", n); }
      function _throw(n) { _asyncGeneratorStep(a, r, o, _next, _throw, "throw", n); }
      _next(void 0);
    });
  };
}"#,
    },
    HelperSource {
        name: "OverloadYield",
        requires: &[],
        code: r#"function _OverloadYield(e, d) {
  this.v = e, this.k = d;
}"#,
    },
    HelperSource {
        name: "awaitAsyncGenerator",
        requires: &["OverloadYield"],
        code: r#"function _awaitAsyncGenerator(e) {
  return new _OverloadYield(e, 0);
}"#,
    },
    HelperSource {
        name: "AsyncGenerator",
        requires: &["OverloadYield"],
        code: r#"function _AsyncGenerator(e) {
  var r, t;
  function resume(r, t) {
    try {
      var n = e[r](t), o = n.value, u = o instanceof _OverloadYield;
      Promise.resolve(u ? o.v : o).then(function (t) {
        if (u) {
          var i = "return" === r ? "return" : "next";
          if (!o.k || t.done) return resume(i, t);
          t = e[i](t).value;
        }
        settle(n.done ? "return" : "normal", t);
      }, function (e) { resume("throw", e); });
    } catch (e) {
      settle("throw", e);
    }
  }
  function settle(e, n) {
    switch (e) {
      case "return": r.resolve({ value: n, done: !0 }); break;
      case "throw": r.reject(n); break;
      default: r.resolve({ value: n, done: !1 });
    }
    (r = r.next) ? resume(r.key, r.arg) : t = null;
  }
  this._invoke = function (e, n) {
    return new Promise(function (o, u) {
      var i = { key: e, arg: n, resolve: o, reject: u, next: null };
      t ? t = t.next = i : (r = t = i, resume(e, n));
    });
  }, "function" != typeof e.return && (this.return = void 0);
}
_AsyncGenerator.prototype["function" == typeof Symbol && Symbol.asyncIterator || "@@asyncIterator"] = function () { return this; };
_AsyncGenerator.prototype.next = function (e) { return this._invoke("next", e); };
_AsyncGenerator.prototype.throw = function (e) { return this._invoke("throw", e); };
_AsyncGenerator.prototype.return = function (e) { return this._invoke("return", e); };"#,
    },
    HelperSource {
        name: "wrapAsyncGenerator",
        requires: &["AsyncGenerator"],
        code: r#"function _wrapAsyncGenerator(e) {
  return function () { return new _AsyncGenerator(e.apply(this, arguments)); };
}"#,
    },
    HelperSource {
        name: "AsyncFromSyncIterator",
        requires: &[],
        code: r#"function _AsyncFromSyncIterator(r) {
  function continuation(r) {
    if (Object(r) !== r) return Promise.reject(new TypeError(r + " is not an object."));
    var n = r.done;
    return Promise.resolve(r.value).then(function (r) { return { value: r, done: n }; });
  }
  return _AsyncFromSyncIterator = function (r) { this.s = r, this.n = r.next; }, _AsyncFromSyncIterator.prototype = {
    s: null,
    n: null,
    next: function () { return continuation(this.n.apply(this.s, arguments)); },
    return: function (r) { var n = this.s.return; return void 0 === n ? Promise.resolve({ value: r, done: !0 }) : continuation(n.apply(this.s, arguments)); },
    throw: function (r) { var n = this.s.throw; return void 0 === n ? Promise.reject(r) : continuation(n.apply(this.s, arguments)); }
  }, new _AsyncFromSyncIterator(r);
}"#,
    },
    HelperSource {
        name: "asyncIterator",
        requires: &["AsyncFromSyncIterator"],
        code: r#"function _asyncIterator(r) {
  var n, t, o, e = 2;
  for ("undefined" != typeof Symbol && (t = Symbol.asyncIterator, o = Symbol.iterator); e--;) {
    if (t && null != (n = r[t])) return n.call(r);
    if (o && null != (n = r[o])) return new _AsyncFromSyncIterator(n.call(r));
    t = "@@asyncIterator", o = "@@iterator";
  }
  throw new TypeError("Object is not async iterable");
}"#,
    },
    HelperSource {
        name: "asyncGeneratorDelegate",
        requires: &["OverloadYield"],
        code: r#"function _asyncGeneratorDelegate(t) {
  var e = {}, n = !1;
  function pump(e, r) {
    return n = !0, r = new Promise(function (n) { n(t[e](r)); }), { done: !1, value: new _OverloadYield(r, 1) };
  }
  return e["undefined" != typeof Symbol && Symbol.iterator || "@@iterator"] = function () { return this; }, e.next = function (t) { return n ? (n = !1, t) : pump("next", t); }, "function" == typeof t.throw && (e.throw = function (t) { if (n) throw n = !1, t; return pump("throw", t); }), "function" == typeof t.return && (e.return = function (t) { return n ? (n = !1, t) : pump("return", t); }), e;
}"#,
    },
    HelperSource {
        name: "checkPrivateRedeclaration",
        requires: &[],
        code: r#"function _checkPrivateRedeclaration(e, t) {
  if (t.has(e)) throw new TypeError("Cannot initialize the same private elements twice on an object");
}"#,
    },
    HelperSource {
        name: "classPrivateFieldInitSpec",
        requires: &["checkPrivateRedeclaration"],
        code: r#"function _classPrivateFieldInitSpec(e, t, a) {
  _checkPrivateRedeclaration(e, t), t.set(e, a);
}"#,
    },
    HelperSource {
        name: "classPrivateMethodInitSpec",
        requires: &["checkPrivateRedeclaration"],
        code: r#"function _classPrivateMethodInitSpec(e, a) {
  _checkPrivateRedeclaration(e, a), a.add(e);
}"#,
    },
    HelperSource {
        name: "assertClassBrand",
        requires: &[],
        code: r#"function _assertClassBrand(e, t, n) {
  if ("function" == typeof e ? e === t : e.has(t)) return arguments.length < 3 ? t : n;
  throw new TypeError("Private element is not present on this object");
}"#,
    },
    HelperSource {
        name: "classPrivateFieldGet2",
        requires: &["assertClassBrand"],
        code: r#"function _classPrivateFieldGet2(s, a) {
  return s.get(_assertClassBrand(s, a));
}"#,
    },
    HelperSource {
        name: "classPrivateFieldSet2",
        requires: &["assertClassBrand"],
        code: r#"function _classPrivateFieldSet2(s, a, r) {
  return s.set(_assertClassBrand(s, a), r), r;
}"#,
    },
    HelperSource {
        name: "toSetter",
        requires: &[],
        code: r#"function _toSetter(t, e, n) {
  e || (e = []);
  var r = e.length++;
  return Object.defineProperty({}, "_", { set: function (o) { e[r] = o, t.apply(n, e); } });
}"#,
    },
    HelperSource {
        name: "classPrivateFieldLooseKey",
        requires: &[],
        code: r#"var _privateKeyId = 0;
function _classPrivateFieldLooseKey(e) {
  return "__private_" + _privateKeyId++ + "_" + e;
}"#,
    },
    HelperSource {
        name: "classPrivateFieldLooseBase",
        requires: &[],
        code: r#"function _classPrivateFieldLooseBase(e, t) {
  if (!{}.hasOwnProperty.call(e, t)) throw new TypeError("attempted to use private field on non-instance");
  return e;
}"#,
    },
    HelperSource {
        name: "getPrototypeOf",
        requires: &[],
        code: r#"function _getPrototypeOf(t) {
  return _getPrototypeOf = Object.setPrototypeOf ? Object.getPrototypeOf.bind() : function (t) { return t.__proto__ || Object.getPrototypeOf(t); }, _getPrototypeOf(t);
}"#,
    },
    HelperSource {
        name: "superPropBase",
        requires: &["getPrototypeOf"],
        code: r#"function _superPropBase(t, o) {
  for (; !{}.hasOwnProperty.call(t, o) && null !== (t = _getPrototypeOf(t)););
  return t;
}"#,
    },
    HelperSource {
        name: "get",
        requires: &["superPropBase"],
        code: r#"function _get() {
  return _get = "undefined" != typeof Reflect && Reflect.get ? Reflect.get.bind() : function (e, t, r) {
    var p = _superPropBase(e, t);
    if (p) {
      var n = Object.getOwnPropertyDescriptor(p, t);
      return n.get ? n.get.call(arguments.length < 3 ? e : r) : n.value;
    }
  }, _get.apply(null, arguments);
}"#,
    },
    HelperSource {
        name: "superPropGet",
        requires: &["get", "getPrototypeOf"],
        code: r#"function _superPropGet(t, o, e, r) {
  var p = _get(_getPrototypeOf(1 & r ? t.prototype : t), o, e);
  return 2 & r && "function" == typeof p ? function (t) { return p.apply(e, t); } : p;
}"#,
    },
    HelperSource {
        name: "set",
        requires: &["superPropBase", "defineProperty"],
        code: r#"function _reflectSet(e, r, t, o) {
  return _reflectSet = "undefined" != typeof Reflect && Reflect.set ? Reflect.set : function (e, r, t, o) {
    var f, i = _superPropBase(e, r);
    if (i) {
      if ((f = Object.getOwnPropertyDescriptor(i, r)).set) return f.set.call(o, t), !0;
      if (!f.writable) return !1;
    }
    if (f = Object.getOwnPropertyDescriptor(o, r)) {
      if (!f.writable) return !1;
      f.value = t, Object.defineProperty(o, r, f);
    } else _defineProperty(o, r, t);
    return !0;
  }, _reflectSet(e, r, t, o);
}
function _set(e, r, t, o, f) {
  if (!_reflectSet(e, r, t, o || e) && f) throw new TypeError("failed to set property");
  return t;
}"#,
    },
    HelperSource {
        name: "superPropSet",
        requires: &["set", "getPrototypeOf"],
        code: r#"function _superPropSet(t, e, o, r, p, f) {
  return _set(_getPrototypeOf(f ? t.prototype : t), e, o, r, p);
}"#,
    },
    HelperSource {
        name: "readOnlyError",
        requires: &[],
        code: r#"function _readOnlyError(r) {
  throw new TypeError('"' + r + '" is read-only');
}"#,
    },
    HelperSource {
        name: "writeOnlyError",
        requires: &[],
        code: r#"function _writeOnlyError(r) {
  throw new TypeError('"' + r + '" is write-only');
}"#,
    },
    HelperSource {
        name: "checkInRHS",
        requires: &[],
        code: r#"function _checkInRHS(e) {
  if (Object(e) !== e) throw TypeError("right-hand side of 'in' should be an object, got " + (null !== e ? typeof e : "null"));
  return e;
}"#,
    },
    HelperSource {
        name: "taggedTemplateLiteral",
        requires: &[],
        code: r#"function _taggedTemplateLiteral(e, t) {
  return t || (t = e.slice(0)), Object.freeze(Object.defineProperties(e, { raw: { value: Object.freeze(t) } }));
}"#,
    },
];

fn find(name: &str) -> Option<&'static HelperSource> {
    HELPERS.iter().find(|h| h.name == name)
}

/// Helper names referenced as `babelHelpers.<name>` in `code`.
pub fn referenced(code: &str) -> BTreeSet<String> {
    let pattern = format!("{HELPER_OBJECT}.");
    code.match_indices(&pattern)
        .map(|(pos, _)| {
            code[pos + pattern.len()..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
                .collect::<String>()
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// `var babelHelpers = ...;` defining `used` and everything they call, or an
/// empty string when nothing is used.
pub fn prelude(used: &BTreeSet<String>) -> Result<String, String> {
    if used.is_empty() {
        return Ok(String::new());
    }

    let mut order = Vec::new();
    for name in used {
        let helper = find(name).ok_or_else(|| {
            format!("syntax needs helper `{name}`, which is not bundled; raise [scripts] target")
        })?;
        include(helper, &mut order);
    }

    let mut out = format!("var {HELPER_OBJECT} = (function () {{\n");
    for helper in &order {
        out.push_str(helper.code);
        out.push('\n');
    }
    let exports: Vec<_> = used.iter().map(|name| format!("{name}: _{name}")).collect();
    out.push_str(&format!("return {{ {} }};\n}})();\n", exports.join(", ")));
    Ok(out)
}

/// Depth-first: requirements before the helper itself, each once.
fn include(helper: &'static HelperSource, order: &mut Vec<&'static HelperSource>) {
    if order.iter().any(|h| h.name == helper.name) {
        return;
    }
    for dep in helper.requires.iter().filter_map(|name| find(name)) {
        include(dep, order);
    }
    order.push(helper);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_referenced() {
        let code = "var a = babelHelpers.objectSpread2({}, b);\nbabelHelpers.asyncToGenerator(function* () {});\nbabelHelpers.objectSpread2(c);";
        assert_eq!(referenced(code), names(&["asyncToGenerator", "objectSpread2"]));
        assert!(referenced("const babelHelpers_ = 1;").is_empty());
    }

    #[test]
    fn test_prelude_includes_requirements_once() {
        let out = prelude(&names(&["objectSpread2", "defineProperty"])).unwrap();
        assert!(out.starts_with("var babelHelpers = (function () {\n"));
        assert_eq!(out.matches("function _defineProperty(").count(), 1);
        assert!(out.contains("function _toPrimitive("));
        assert!(out.contains("function _ownKeys("));
        assert!(out.find("function _ownKeys(").unwrap() < out.find("function _objectSpread2(").unwrap());
        assert!(out.contains("return { defineProperty: _defineProperty, objectSpread2: _objectSpread2 };"));
    }

    #[test]
    fn test_prelude_empty_when_unused() {
        assert_eq!(prelude(&BTreeSet::new()).unwrap(), "");
    }

    #[test]
    fn test_unknown_helper_is_error() {
        let err = prelude(&names(&["decorate"])).unwrap_err();
        assert!(err.contains("decorate"), "{err}");
    }

    #[test]
    fn test_requirements_exist() {
        for helper in HELPERS {
            for dep in helper.requires {
                assert!(find(dep).is_some(), "{} requires unknown {dep}", helper.name);
            }
            assert!(
                helper.code.contains(&format!("function _{}(", helper.name)),
                "{}",
                helper.name
            );
        }
    }
}
