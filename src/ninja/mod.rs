//! A syntax-level writer that emits a well-formed `build.ninja`: pools,
//! rules, builds, includes, subninjas, defaults, variable expansion, and
//! correct escaping and word-wrapping.
//!
//! The writer is a pure sink over an in-memory buffer (spec 9's "streaming
//! output" note): no I/O happens until the caller asks for the finished
//! text and writes it out itself (see [`crate::planner`]).

pub mod escape;
pub mod wrap;

pub use escape::{escape, escape_build, escape_path};

use indexmap::IndexMap;

/// The sparse option bag for a `rule` declaration (spec 3, "RuleSet").
///
/// Every field is optional; emitters check presence directly rather than
/// defaulting absent values to the empty string, since Ninja treats
/// `key =` as explicitly unsetting a variable.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RuleSet {
    /// Human-readable progress line, e.g. `"Compiling $in"`.
    pub description: Option<String>,
    /// Path to a compiler-emitted dependency file.
    pub depfile: Option<String>,
    /// Whether this rule regenerates the build file itself.
    pub generator: bool,
    /// The console/job pool this rule's builds run in.
    pub pool: Option<String>,
    /// Whether Ninja should re-stat outputs to detect no-op updates.
    pub restat: bool,
    /// Path to a response file Ninja should write before running the rule.
    pub rspfile: Option<String>,
    /// Contents to write into `rspfile`.
    pub rspfile_content: Option<String>,
    /// Dependency format: `"gcc"` or `"msvc"`.
    pub deps: Option<String>,
}

/// The sparse option bag for a `build` declaration (spec 3, "BuildSet").
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildSet {
    /// Explicit inputs, referenced as `$in`.
    pub inputs: Vec<String>,
    /// Implicit inputs: participate in rebuild checks but not `$in`.
    pub implicit: Vec<String>,
    /// Order-only inputs: must exist first but don't force a rebuild.
    pub order_only: Vec<String>,
    /// Additional outputs beyond the explicit ones.
    pub implicit_outputs: Vec<String>,
    /// Local variable overrides scoped to this build edge.
    pub variables: IndexMap<String, String>,
    /// The console/job pool this build runs in.
    pub pool: Option<String>,
    /// Path to a dynamic dependency file.
    pub dyndep: Option<String>,
}

/// Streamed textual construction of a Ninja build file.
///
/// Not thread-safe: intended for a single producer (spec 5, "Shared
/// resources").
#[derive(Debug, Default)]
pub struct Writer {
    buf: String,
    width: usize,
}

impl Writer {
    /// Create a writer using the default 78-column wrap width.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            width: wrap::DEFAULT_WIDTH,
        }
    }

    /// Create a writer with an explicit wrap width (used by tests
    /// exercising scenario S4).
    #[must_use]
    pub fn with_width(width: usize) -> Self {
        Self {
            buf: String::new(),
            width,
        }
    }

    /// Consume the writer, returning the finished document text.
    #[must_use]
    pub fn finish(self) -> String {
        self.buf
    }

    /// Emit a blank line.
    pub fn newline(&mut self) {
        self.buf.push('\n');
    }

    /// Emit a `#`-prefixed comment line.
    pub fn comment(&mut self, text: &str) {
        assert_no_newline(text);
        self.buf.push_str("# ");
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    /// Emit a single `key = value` assignment at the given indent level.
    pub fn variable(&mut self, key: &str, value: &str, level: usize) {
        assert_no_newline(value);
        self.emit_kv(key, value, level);
    }

    /// Emit a `key = v1 v2 ...` assignment whose values are space-joined
    /// and path-escaped.
    pub fn variable_list(&mut self, key: &str, values: &[String], level: usize) {
        let joined = join_paths(values);
        self.emit_kv(key, &joined, level);
    }

    /// Declare a console/job pool with a given concurrency `depth`.
    pub fn pool(&mut self, name: &str, depth: u32) {
        assert_no_newline(name);
        self.buf.push_str(&wrap::wrap(&format!("pool {name}"), 0, self.width));
        self.buf.push('\n');
        self.variable("depth", &depth.to_string(), 1);
    }

    /// Declare a rule named `name` running `command`, with the optional
    /// fields in `rules`.
    pub fn rule(&mut self, name: &str, command: &str, rules: &RuleSet) {
        assert_no_newline(name);
        assert_no_newline(command);
        self.buf.push_str(&wrap::wrap(&format!("rule {name}"), 0, self.width));
        self.buf.push('\n');
        self.variable("command", command, 1);
        if let Some(description) = &rules.description {
            self.variable("description", description, 1);
        }
        if let Some(depfile) = &rules.depfile {
            self.variable("depfile", depfile, 1);
        }
        if rules.generator {
            self.variable("generator", "1", 1);
        }
        if let Some(pool) = &rules.pool {
            self.variable("pool", pool, 1);
        }
        if rules.restat {
            self.variable("restat", "1", 1);
        }
        if let Some(rspfile) = &rules.rspfile {
            self.variable("rspfile", rspfile, 1);
        }
        if let Some(content) = &rules.rspfile_content {
            self.variable("rspfile_content", content, 1);
        }
        if let Some(deps) = &rules.deps {
            self.variable("deps", deps, 1);
        }
    }

    /// Declare a build edge producing `outputs` via `rule`, with inputs and
    /// attributes from `build`. Returns `outputs` unchanged, mirroring the
    /// spec's `build(...) -> outputs[]` signature so callers can chain the
    /// produced output paths into further aggregation without re-declaring
    /// them.
    pub fn build(&mut self, outputs: &[String], rule: &str, build: &BuildSet) -> Vec<String> {
        for path in outputs.iter().chain(build.implicit_outputs.iter()) {
            assert_no_newline(path);
        }
        for path in build
            .inputs
            .iter()
            .chain(build.implicit.iter())
            .chain(build.order_only.iter())
        {
            assert_no_newline(path);
        }

        let mut head = String::from("build ");
        head.push_str(&join_build_paths(outputs));
        if !build.implicit_outputs.is_empty() {
            head.push_str(" | ");
            head.push_str(&join_build_paths(&build.implicit_outputs));
        }
        head.push_str(": ");
        head.push_str(&escape_build(rule));
        if !build.inputs.is_empty() {
            head.push(' ');
            head.push_str(&join_build_paths(&build.inputs));
        }
        if !build.implicit.is_empty() {
            head.push_str(" | ");
            head.push_str(&join_build_paths(&build.implicit));
        }
        if !build.order_only.is_empty() {
            head.push_str(" || ");
            head.push_str(&join_build_paths(&build.order_only));
        }

        self.buf.push_str(&wrap::wrap(&head, 0, self.width));
        self.buf.push('\n');

        if let Some(pool) = &build.pool {
            self.variable("pool", pool, 1);
        }
        if let Some(dyndep) = &build.dyndep {
            self.variable("dyndep", dyndep, 1);
        }
        for (key, value) in &build.variables {
            self.variable(key, value, 1);
        }

        outputs.to_vec()
    }

    /// Emit an `include` statement.
    pub fn include(&mut self, path: &str) {
        assert_no_newline(path);
        self.buf
            .push_str(&wrap::wrap(&format!("include {}", escape_path(path)), 0, self.width));
        self.buf.push('\n');
    }

    /// Emit a `subninja` statement.
    pub fn subninja(&mut self, path: &str) {
        assert_no_newline(path);
        self.buf.push_str(&wrap::wrap(
            &format!("subninja {}", escape_path(path)),
            0,
            self.width,
        ));
        self.buf.push('\n');
    }

    /// Emit a `default` statement naming the given target paths.
    pub fn default(&mut self, paths: &[String]) {
        let joined = join_build_paths(paths);
        self.buf
            .push_str(&wrap::wrap(&format!("default {joined}"), 0, self.width));
        self.buf.push('\n');
    }

    fn emit_kv(&mut self, key: &str, value: &str, level: usize) {
        assert_no_newline(key);
        let line = format!("{key} = {value}");
        self.buf.push_str(&wrap::wrap(&line, level, self.width));
        self.buf.push('\n');
    }
}

fn join_paths(values: &[String]) -> String {
    values
        .iter()
        .map(|v| escape_path(v))
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_build_paths(values: &[String]) -> String {
    values
        .iter()
        .map(|v| escape_build(v))
        .collect::<Vec<_>>()
        .join(" ")
}

fn assert_no_newline(value: &str) {
    assert!(
        !value.contains('\n'),
        "Ninja writer values must not contain newlines: {value:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_rule_emission() {
        let mut writer = Writer::new();
        writer.rule(
            "cc",
            "gcc -c $in -o $out",
            &RuleSet {
                description: Some("CC $in".to_owned()),
                depfile: Some("$out.d".to_owned()),
                deps: Some("gcc".to_owned()),
                ..RuleSet::default()
            },
        );
        assert_eq!(
            writer.finish(),
            "rule cc\n  command = gcc -c $in -o $out\n  description = CC $in\n  depfile = $out.d\n  deps = gcc\n"
        );
    }

    #[test]
    fn s2_build_with_implicit_and_order_only() {
        let mut writer = Writer::new();
        writer.build(
            &["a.o".to_owned()],
            "cc",
            &BuildSet {
                inputs: vec!["a.c".to_owned()],
                implicit: vec!["h.h".to_owned()],
                order_only: vec!["dir".to_owned()],
                ..BuildSet::default()
            },
        );
        assert_eq!(writer.finish(), "build a.o: cc a.c | h.h || dir\n");
    }

    #[test]
    fn s3_path_escaping() {
        let mut writer = Writer::new();
        writer.build(
            &["weird file:name.o".to_owned()],
            "cc",
            &BuildSet {
                inputs: vec!["src/weird space.c".to_owned()],
                ..BuildSet::default()
            },
        );
        assert_eq!(
            writer.finish(),
            "build weird$ file$:name.o: cc src/weird$ space.c\n"
        );
    }

    #[test]
    fn s4_variable_wrap_at_width_twenty() {
        let mut writer = Writer::with_width(20);
        writer.variable("k", "aaaa bbbb cccc dddd", 0);
        let text = writer.finish();
        let lines: Vec<&str> = text.trim_end_matches('\n').split('\n').collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" $"));
        assert!(lines[1].starts_with("    "));
        assert!(!lines[1].starts_with("     "));
    }

    #[test]
    fn build_returns_outputs_for_chaining() {
        let mut writer = Writer::new();
        let outputs = writer.build(
            &["out.o".to_owned()],
            "cc",
            &BuildSet {
                inputs: vec!["in.c".to_owned()],
                ..BuildSet::default()
            },
        );
        assert_eq!(outputs, vec!["out.o".to_owned()]);
    }

    #[test]
    fn pool_emits_name_and_depth() {
        let mut writer = Writer::new();
        writer.pool("link_pool", 4);
        assert_eq!(writer.finish(), "pool link_pool\n  depth = 4\n");
    }

    #[test]
    fn rule_omits_unset_fields() {
        let mut writer = Writer::new();
        writer.rule("noop", "true", &RuleSet::default());
        assert_eq!(writer.finish(), "rule noop\n  command = true\n");
    }

    #[test]
    #[should_panic(expected = "newline")]
    fn refuses_newline_in_value() {
        let mut writer = Writer::new();
        writer.variable("k", "a\nb", 0);
    }

    #[test]
    fn two_runs_produce_byte_identical_output() {
        let build = |values: &[&str]| {
            let mut writer = Writer::new();
            for name in values {
                writer.rule(name, "true", &RuleSet::default());
            }
            writer.finish()
        };
        let names = ["a", "b", "c"];
        assert_eq!(build(&names), build(&names));
    }
}
