//! Integration tests for the scan and build pipeline.
//!
//! Each test builds a small documentation repository with the git CLI and
//! runs [`vershelf::engine::run`] against it.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use vershelf::core::config::Override;
use vershelf::core::metadata::MetadataTable;
use vershelf::core::types::RefSource;
use vershelf::engine::{run, Context, RunError, RunOutcome};

/// A repository with documentation under `docs/`.
struct DocsRepo {
    dir: TempDir,
}

impl DocsRepo {
    /// Create an empty repository on `main`.
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init"]);
        run_git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn docs(&self) -> PathBuf {
        self.path().join("docs")
    }

    fn write(&self, path: &str, content: &str) {
        let full = self.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }

    fn remove(&self, path: &str) {
        std::fs::remove_file(self.path().join(path)).unwrap();
    }

    fn commit(&self, message: &str) {
        run_git(self.path(), &["add", "-A"]);
        run_git(self.path(), &["commit", "-m", message]);
    }

    fn git(&self, args: &[&str]) {
        run_git(self.path(), args);
    }

    /// Commit docs with the given configuration on the current branch.
    fn commit_docs(&self, config: &str) {
        self.write("docs/index.rst", "Index\n");
        self.write("docs/guide/install.rst", "Install\n");
        self.write("docs/vershelf.toml", config);
        self.commit("docs");
    }
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

fn config(release: &str, multiversion: &str) -> String {
    format!(
        "project = \"demo\"\nversion = \"1\"\nrelease = \"{release}\"\n\n[multiversion]\n{multiversion}\n"
    )
}

fn context(repo: &DocsRepo, out: &Path) -> Context {
    Context::new(repo.docs(), out, repo.path())
}

/// Run with `--dump-metadata` and parse the table.
fn dump(ctx: &Context) -> MetadataTable {
    let mut ctx = ctx.clone();
    ctx.dump_metadata = true;
    match run(&ctx).expect("run failed") {
        RunOutcome::Dumped { json } => serde_json::from_str(&json).expect("invalid table json"),
        other => panic!("expected metadata dump, got {other:?}"),
    }
}

mod scan {
    use super::*;

    #[test]
    fn branches_and_tags() {
        let repo = DocsRepo::new();
        repo.commit_docs(&config("1.0", ""));
        repo.git(&["tag", "v1.0"]);
        let out = TempDir::new().unwrap();

        let table = dump(&context(&repo, out.path()));
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["main", "v1.0"]);

        let main = table.get("main").unwrap();
        assert_eq!(main.source, RefSource::Heads);
        assert!(!main.is_released);
        assert_eq!(main.release, "1.0");
        assert_eq!(main.docnames, vec!["guide/install", "index"]);
        assert!(main.outputdir.ends_with("main"));
        assert!(main.sourcedir.ends_with("docs"));

        let tag = table.get("v1.0").unwrap();
        assert_eq!(tag.source, RefSource::Tags);
        assert!(tag.is_released);
        // Both refs point at one commit and share one extracted tree
        assert_eq!(tag.basedir, main.basedir);
    }

    #[test]
    fn ref_without_sourcedir_skipped() {
        let repo = DocsRepo::new();
        repo.write("README.md", "# Readme\n");
        repo.commit("readme");
        repo.git(&["branch", "old"]);
        repo.commit_docs(&config("1.0", ""));
        let out = TempDir::new().unwrap();

        let table = dump(&context(&repo, out.path()));
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["main"]);
    }

    #[test]
    fn per_version_release_and_docnames() {
        let repo = DocsRepo::new();
        repo.commit_docs(&config("0.9", ""));
        repo.git(&["tag", "v0.9"]);
        repo.write("docs/changelog.rst", "Changes\n");
        repo.write("docs/vershelf.toml", &config("1.0", ""));
        repo.commit("1.0");
        let out = TempDir::new().unwrap();

        let table = dump(&context(&repo, out.path()));
        let old = table.get("v0.9").unwrap();
        let new = table.get("main").unwrap();
        assert_eq!(old.release, "0.9");
        assert_eq!(new.release, "1.0");
        assert!(!old.has_docname("changelog"));
        assert!(new.has_docname("changelog"));
    }

    #[test]
    fn outputdir_collision_keeps_first() {
        let repo = DocsRepo::new();
        repo.commit_docs(&config("1.0", "outputdir_format = \"{config.release}\""));
        repo.git(&["branch", "feature"]);
        let out = TempDir::new().unwrap();

        let table = dump(&context(&repo, out.path()));
        // Both refs render to <out>/1.0; "feature" sorts first
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["feature"]);
        assert!(table.get("feature").unwrap().outputdir.ends_with("1.0"));
    }

    #[test]
    fn tree_without_config_uses_head_config() {
        let repo = DocsRepo::new();
        repo.write("docs/index.rst", "Index\n");
        repo.commit("docs without config");
        repo.git(&["branch", "noconf"]);
        repo.write("docs/vershelf.toml", &config("2.0", ""));
        repo.commit("config");
        let out = TempDir::new().unwrap();

        let table = dump(&context(&repo, out.path()));
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("noconf").unwrap().release, "2.0");
    }

    #[test]
    fn broken_version_config_skips_version() {
        let repo = DocsRepo::new();
        repo.write("docs/index.rst", "Index\n");
        repo.write("docs/vershelf.toml", "release = [unclosed\n");
        repo.commit("broken");
        repo.git(&["branch", "broken"]);
        repo.write("docs/vershelf.toml", &config("1.0", ""));
        repo.commit("fixed");
        let out = TempDir::new().unwrap();

        let table = dump(&context(&repo, out.path()));
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["main"]);
    }

    #[test]
    fn remote_refs_need_whitelist() {
        let repo = DocsRepo::new();
        repo.commit_docs(&config("1.0", ""));
        repo.git(&["update-ref", "refs/remotes/origin/published", "HEAD"]);
        let out = TempDir::new().unwrap();

        let table = dump(&context(&repo, out.path()));
        assert!(table.get("published").is_none());

        let mut ctx = context(&repo, out.path());
        ctx.defines = vec![Override::parse("multiversion.remote_whitelist=origin").unwrap()];
        let table = dump(&ctx);
        assert_eq!(
            table.get("published").unwrap().source,
            RefSource::Remote("origin".to_string())
        );
    }

    #[test]
    fn whitelists_from_head_config() {
        let repo = DocsRepo::new();
        repo.commit_docs(&config("1.0", "branch_whitelist = 'main$'\ntag_whitelist = 'v2'"));
        repo.git(&["branch", "wip"]);
        repo.git(&["tag", "v1.0"]);
        repo.git(&["tag", "v2.0"]);
        let out = TempDir::new().unwrap();

        let table = dump(&context(&repo, out.path()));
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["main", "v2.0"]);
    }
}

mod failures {
    use super::*;

    #[test]
    fn no_matching_refs() {
        let repo = DocsRepo::new();
        repo.commit_docs(&config("1.0", "branch_whitelist = 'release/'\ntag_whitelist = 'nothing'"));
        let out = TempDir::new().unwrap();

        let err = run(&context(&repo, out.path())).unwrap_err();
        assert!(matches!(err, RunError::NoVersions));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn dump_of_empty_table_succeeds() {
        let repo = DocsRepo::new();
        repo.commit_docs(&config("1.0", "branch_whitelist = 'release/'"));
        let out = TempDir::new().unwrap();

        assert!(dump(&context(&repo, out.path())).is_empty());
    }

    #[test]
    fn missing_head_config_is_fatal() {
        let repo = DocsRepo::new();
        repo.commit_docs(&config("1.0", ""));
        repo.remove("docs/vershelf.toml");
        let out = TempDir::new().unwrap();

        let err = run(&context(&repo, out.path())).unwrap_err();
        assert!(matches!(err, RunError::Config(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn downloadable_target_without_format_is_fatal() {
        let repo = DocsRepo::new();
        repo.commit_docs(&config(
            "1.0",
            "[multiversion.build_targets.html]\nbuilder = \"html\"\ndownloadable = true",
        ));
        let out = TempDir::new().unwrap();

        let err = run(&context(&repo, out.path())).unwrap_err();
        assert!(matches!(err, RunError::Config(_)));
        assert!(std::fs::read_dir(out.path()).unwrap().next().is_none());
    }
}

#[cfg(unix)]
mod builds {
    use super::*;

    /// A build command that records its environment in the output directory.
    const RECORDING_BUILD: &str = r#"build_command = ["sh", "-c", 'for a; do out="$a"; done; mkdir -p "$out" && printf "%s %s" "$VERSHELF_NAME" "$VERSHELF_RELEASE" > "$out/index.html"', "build"]"#;

    #[test]
    fn builds_every_version() {
        let repo = DocsRepo::new();
        repo.commit_docs(&config("1.0", RECORDING_BUILD));
        repo.git(&["tag", "v1.0"]);
        let out = TempDir::new().unwrap();

        let outcome = run(&context(&repo, out.path())).unwrap();
        assert_eq!(outcome, RunOutcome::Built { versions: 2 });
        assert_eq!(
            std::fs::read_to_string(out.path().join("main/index.html")).unwrap(),
            "main 1.0"
        );
        assert_eq!(
            std::fs::read_to_string(out.path().join("v1.0/index.html")).unwrap(),
            "v1.0 1.0"
        );
    }

    #[test]
    fn html_target_merged_and_packaged() {
        let repo = DocsRepo::new();
        let settings = format!(
            "{RECORDING_BUILD}\n\n[multiversion.build_targets.HTML]\nbuilder = \"html\"\ndownloadable = true\ndownload_format = \"zip\""
        );
        repo.commit_docs(&config("1.0", &settings));
        let out = TempDir::new().unwrap();

        run(&context(&repo, out.path())).unwrap();
        let root = out.path().join("main");
        assert_eq!(std::fs::read_to_string(root.join("index.html")).unwrap(), "main 1.0");
        assert!(root.join("artifacts/demo-main.zip").is_file());
        // Intermediate target directory is cleaned up by default
        assert!(!root.join("HTML").exists());
    }

    #[test]
    fn failed_build_propagates_status() {
        let repo = DocsRepo::new();
        repo.commit_docs(&config("1.0", r#"build_command = ["sh", "-c", "exit 3", "build"]"#));
        let out = TempDir::new().unwrap();

        let err = run(&context(&repo, out.path())).unwrap_err();
        assert!(matches!(err, RunError::Build(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn defines_substituted_per_version() {
        let repo = DocsRepo::new();
        repo.commit_docs(&config(
            "1.0",
            r#"build_command = ["sh", "-c", 'for a; do out="$a"; case "$a" in title=*) t="$a";; esac; done; mkdir -p "$out" && printf "%s" "$t" > "$out/title.txt"', "build"]"#,
        ));
        repo.git(&["tag", "v1.0"]);
        let out = TempDir::new().unwrap();

        let mut ctx = context(&repo, out.path());
        ctx.defines = vec![Override::parse("title=Docs $name").unwrap()];
        run(&ctx).unwrap();

        assert_eq!(
            std::fs::read_to_string(out.path().join("v1.0/title.txt")).unwrap(),
            "title=Docs v1.0"
        );
    }
}
