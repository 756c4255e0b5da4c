//! Test utilities for on-disk source trees

use std::fs;
use tempfile::TempDir;

/// Create a temporary repository with a specific file structure
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

/// A small web app: routes, components, styles, an alias import and a package.
pub fn create_web_repo() -> TempDir {
    create_repo_with_structure(&[
        (".gitignore", "*.log\ncoverage/\n"),
        ("package.json", "{ \"name\": \"web\" }\n"),
        (
            "app/routes/index.tsx",
            "import { Header } from '~/app/components/Header';\nimport './index.css';\nexport default function Index() { return <Header />; }\n",
        ),
        ("app/routes/index.css", "@import url('../styles/base.css');\n"),
        ("app/styles/base.css", "body { margin: 0; }\n"),
        (
            "app/components/Header.tsx",
            "import React from 'react';\nimport { cx } from '../lib';\nexport function Header() { return <h1 className={cx('h')} />; }\n",
        ),
        ("app/lib/index.ts", "export const cx = (...c: string[]) => c.join(' ');\n"),
        ("debug.log", "noise\n"),
        ("coverage/report.js", "import x from '../app/lib';\n"),
        ("node_modules/react/index.js", "module.exports = {};\n"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_web_repo() {
        let temp_dir = create_web_repo();
        let root = temp_dir.path();

        assert!(root.join("app/routes/index.tsx").exists());
        assert!(root.join("app/lib/index.ts").exists());
        assert!(root.join("node_modules/react/index.js").exists());
    }
}
