//! Minimal fixture manifests for tests.

use std::io::{self, Write};

/// Write a minimal manifest declaring only the required package table.
pub fn write_minimal_manifest(file: &mut impl Write) -> io::Result<()> {
    writeln!(
        file,
        concat!(
            "[package]\n",
            "name = \"hello\"\n",
            "version = \"0.1.0\"\n",
        ),
    )
}

/// Write a manifest declaring a single dependency requirement.
pub fn write_manifest_with_dependency(
    file: &mut impl Write,
    dep_name: &str,
    dep_range: &str,
) -> io::Result<()> {
    writeln!(
        file,
        concat!(
            "[package]\n",
            "name = \"hello\"\n",
            "version = \"0.1.0\"\n",
            "\n",
            "[dependencies]\n",
            "{dep_name} = \"{dep_range}\"\n",
        ),
        dep_name = dep_name,
        dep_range = dep_range,
    )
}
