use std::fs;
use std::path::PathBuf;

use indoc::indoc;
use jinja_lens::{Driver, EngineConfig, EngineError};

/// 每个测试一个独立目录
fn workspace(name: &str, files: &[(&str, &str)]) -> Vec<PathBuf> {
    let dir = std::env::temp_dir().join(format!("jinja-lens-{}-{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    files
        .iter()
        .map(|(file, content)| {
            let path = dir.join(file);
            fs::write(&path, content).unwrap();
            path
        })
        .collect()
}

#[test]
fn reports_undefined_variables_rustc_style() {
    let paths = workspace(
        "undefined",
        &[(
            "index.html",
            indoc! {"
                {% set user = 1 %}
                {{ usr.name }}
            "},
        )],
    );
    let mut driver = Driver::new(EngineConfig::default());
    let diagnostics = driver.check_files(&paths).unwrap();

    assert_eq!(diagnostics.len(), 1);
    let text = &diagnostics[0];
    assert!(text.starts_with("Error: no binding for `usr` in scope"));
    assert!(text.contains("index.html:2:4"));
    assert!(text.contains("  2| {{ usr.name }}"));
    assert!(text.ends_with("   |    ^^^"));
}

#[test]
fn backend_files_are_loaded_before_templates() {
    let paths = workspace(
        "backend",
        &[
            ("page.html", "{{ title }} {{ missing }}"),
            ("views.py", "return tmpl.render(title='Home')"),
            ("notes.txt", "{{ ignored }}"),
        ],
    );
    let mut driver = Driver::new(EngineConfig::default());
    let diagnostics = driver.check_files(&paths).unwrap();

    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].contains("`missing`"));
}

#[test]
fn directory_argument_is_walked() {
    let paths = workspace(
        "directory",
        &[
            ("layout.html", "{{ title }} {{ absent }}"),
            ("app.py", "return tmpl.render(title='Home')"),
        ],
    );
    let dir = paths[0].parent().unwrap().to_path_buf();
    let mut driver = Driver::new(EngineConfig::default());
    let diagnostics = driver.check_files(&[dir]).unwrap();

    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].contains("`absent`"));
}

#[test]
fn missing_file_is_an_io_error() {
    let mut driver = Driver::new(EngineConfig::default());
    let result = driver.check_files(&[PathBuf::from("/definitely/not/here.html")]);
    assert!(matches!(result, Err(EngineError::Io { .. })));
}
