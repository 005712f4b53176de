//! Test utilities for grove-indexer

use std::fs;
use tempfile::TempDir;

/// Create a temporary repository with the given (path, content) files.
pub fn create_repo_with_structure(structure: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    for (path, content) in structure {
        let full_path = root.join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content).unwrap();
    }

    temp_dir
}

/// Four Python files, three of which import `hub.py`.
pub fn create_hub_repo() -> TempDir {
    create_repo_with_structure(&[
        ("hub.py", "def run(task):\n    return task\n\n\ndef helper():\n    pass\n"),
        ("a.py", "import hub\n\n\ndef main():\n    hub.run(1)\n"),
        ("b.py", "from hub import run\n\nrun(2)\n"),
        ("c.py", "import hub as h\n\n\nclass Job:\n    def go(self):\n        h.helper()\n"),
    ])
}

/// `hub.py` with one function and three files each doing `from hub import run`.
pub fn create_from_import_hub_repo() -> TempDir {
    create_repo_with_structure(&[
        ("hub.py", "def run(task):\n    return task\n"),
        ("a.py", "from hub import run\n\nrun(1)\n"),
        ("b.py", "from hub import run\n\n\ndef go():\n    run(2)\n"),
        ("c.py", "from hub import run\n\n\nclass Task:\n    def start(self):\n        run(3)\n"),
    ])
}
