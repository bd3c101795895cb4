use warc2offline::{ArticleUrlRewriter, JsRewriter};

const THIS_CHECK: &str = "_____WB$wombat$check$this$function_____(this)";

// Item stored for `https://exemple.com/some/path/`: depth 3.
const MODULE_ITEM: &str = "exemple.com/some/path/";

fn rewrite(src: &str) -> String {
    JsRewriter::new(ArticleUrlRewriter::new("example.com/index.html")).rewrite(src)
}

fn rewrite_at(item_path: &str, src: &str) -> String {
    JsRewriter::new(ArticleUrlRewriter::new(item_path)).rewrite(src)
}

fn wrap_script(text: &str) -> String {
    let mut out = String::from(
        "var _____WB$wombat$assign$function_____ = function(name) {return (self.\
         _wb_wombat && self._wb_wombat.local_init && self._wb_wombat.local_init\
         (name)) || self[name]; };\n\
         if (!self.__WB_pmw) { self.__WB_pmw = function(obj) { this.__WB_source = \
         obj; return this; } }\n{\n",
    );
    for name in [
        "window",
        "globalThis",
        "self",
        "document",
        "location",
        "top",
        "parent",
        "frames",
        "opener",
    ] {
        out.push_str(&format!(
            "let {name} = _____WB$wombat$assign$function_____(\"{name}\");\n"
        ));
    }
    out.push_str("let arguments;\n\n");
    out.push_str(text);
    out.push_str("\n}");
    out
}

fn wrap_import(text: &str) -> String {
    format!(
        "import {{ window, globalThis, self, document, location, top, parent, frames, opener }} \
         from \"../../../_offline_static/__wb_module_decl.js\";\n{text}"
    )
}

#[test]
fn test_this_rewrite() {
    for src in [
        "a = this;",
        "return this.location",
        "(a,b,Q.contains(i[t], this))",
        "a = this.location.href; exports.Foo = Foo; /* export className */",
    ] {
        assert_eq!(rewrite(src), src.replace("this", THIS_CHECK), "{src}");
    }
}

#[test]
fn test_location_assignment_rewrite() {
    assert_eq!(
        rewrite("location = http://example.com/"),
        wrap_script(
            "location = ((self.__WB_check_loc && self.__WB_check_loc(location, arguments)) || {}).href = http://example.com/"
        )
    );
    assert_eq!(
        rewrite(" location = http://example.com/2"),
        wrap_script(
            " location = ((self.__WB_check_loc && self.__WB_check_loc(location, arguments)) || {}).href = http://example.com/2"
        )
    );
}

#[test]
fn test_wrapped_without_rewrite() {
    for src in [
        "func(location = 0)",
        "window.eval(a)",
        "x = window.eval; x(a);",
        "this. location = 'http://example.com/'",
        "if (self.foo) { console.log('blah') }",
        "window.x = 5",
    ] {
        assert_eq!(rewrite(src), wrap_script(src), "{src}");
    }
}

#[test]
fn test_module_import_rewrite() {
    let cases = [
        (
            "import \"foo\";\n\na = this.location",
            "import \"foo\";\n\na = _____WB$wombat$check$this$function_____(this).location",
        ),
        (
            "a = this.location\n\nexport { a };\n",
            "a = _____WB$wombat$check$this$function_____(this).location\n\nexport { a };\n",
        ),
        (
            "import \"https://example.com/file.js\"",
            "import \"../../../example.com/file.js\"",
        ),
        (
            "\nimport {A, B}\n from\n \"https://example.com/file.js\"",
            "\nimport {A, B}\n from\n \"../../../example.com/file.js\"",
        ),
        (
            "a = location\n\nexport{ a, $ as b};\n",
            "a = location\n\nexport{ a, $ as b};\n",
        ),
        (
            "import\"import.js\";import{A, B, C} from\"test.js\";(function() => { frames[0].href = \"/abc\"; })",
            "import\"import.js\";import{A, B, C} from\"test.js\";(function() => { frames[0].href = \"/abc\"; })",
        ),
    ];
    for (src, expected) in cases {
        assert_eq!(rewrite_at(MODULE_ITEM, src), wrap_import(expected), "{src}");
    }
}

#[test]
fn test_module_specifiers_follow_item_depth() {
    let src = r#"
import * from "https://example.com/file.js"
import A from "http://example.com/path/file2.js";

import {C, D} from "./abc.js";
import {X, Y} from "../parent.js";
import {E, F, G} from "/path.js";
import { Z } from "../../../path.js";

B = await import(somefile);
"#;
    let expected = r#"
import * from "../../../example.com/file.js"
import A from "../../../example.com/path/file2.js";

import {C, D} from "abc.js";
import {X, Y} from "../parent.js";
import {E, F, G} from "../../path.js";
import { Z } from "../../path.js";

B = await ____wb_rewrite_import__(import.meta.url, somefile);
"#;
    assert_eq!(rewrite_at(MODULE_ITEM, src), wrap_import(expected));
}

#[test]
fn test_export_from_specifier() {
    assert_eq!(
        rewrite_at(MODULE_ITEM, "export { a } from \"https://example.com/a.js\";"),
        wrap_import("export { a } from \"../../../example.com/a.js\";")
    );
}

#[test]
fn test_no_rewrite() {
    for src in [
        "return this.abc",
        "return this object",
        "a = 'some, this object'",
        "{foo: bar, this: other}",
        "this.$location = http://example.com/",
        "this.  $location = http://example.com/",
        "this. _location = http://example.com/",
        "this. alocation = http://example.com/",
        "this.location = http://example.com/",
        ",eval(a)",
        "this.$eval(a)",
        "x = $eval; x(a);",
        "obj = { eval : 1 }",
        "x = obj.eval",
        "x = obj.eval(a)",
        "x = obj._eval(a)",
        "x = obj.$eval(a)",
        "if (a.self.foo) { console.log('blah') }",
        "a.window.x = 5",
        "  postMessage({'a': 'b'})",
        "simport(5);",
        "a.import(5);",
        "$import(5);",
        "async import(val) { ... }",
        "function blah() {\n  const text = \"text: import a from B.js\";\n}\n",
        "function blah() {\n  const text = `\nimport a from \"https://example.com/B.js\"\n`;\n}\n\n",
        "let a = 7; var b = 5; const foo = 4;\n\n",
    ] {
        assert_eq!(rewrite(src), src, "{src}");
    }
}

#[test]
fn test_rewriting_is_idempotent() {
    for src in [
        "location = http://example.com/",
        "window.x = 5",
        "a = this;",
        "x = eval; x(a);",
        "import {C} from \"./abc.js\";\nwindow.x = 1;",
    ] {
        let once = rewrite_at(MODULE_ITEM, src);
        assert_eq!(rewrite_at(MODULE_ITEM, &once), once, "{src}");
    }
}
