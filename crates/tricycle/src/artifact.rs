//! Migration files written next to the project for review and manual runs.

use camino::{Utf8Path, Utf8PathBuf};
use jiff::Timestamp;

use crate::Error;
use crate::reconcile::Mode;

/// Writes `<dir>/<YYYYMMDDHHMMSS>_<slug>.sql` files.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: Utf8PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Write the script for `name`, stamped with the current time.
    pub fn write(&self, name: &str, mode: Mode, sql: &str) -> Result<Utf8PathBuf, Error> {
        self.write_at(name, mode, sql, Timestamp::now())
    }

    pub fn write_at(
        &self,
        name: &str,
        mode: Mode,
        sql: &str,
        at: Timestamp,
    ) -> Result<Utf8PathBuf, Error> {
        std::fs::create_dir_all(&self.dir)?;
        let file = format!("{}_{}.sql", at.strftime("%Y%m%d%H%M%S"), slugify(name));
        let path = self.dir.join(file);
        std::fs::write(&path, render_artifact(name, mode, sql, at))?;
        tracing::info!(path = %path, "wrote migration file");
        Ok(path)
    }
}

/// File contents: a comment header, then the SQL body.
///
/// The checksum covers the body only, so the same script always hashes the
/// same regardless of when it was written.
pub fn render_artifact(name: &str, mode: Mode, sql: &str, at: Timestamp) -> String {
    let checksum = blake3::hash(sql.as_bytes()).to_hex();
    format!(
        "-- migration: {name}\n-- generated: {at}\n-- mode: {mode}\n-- checksum: blake3:{checksum}\n\n{sql}\n"
    )
}

/// Lowercase, with runs of anything that is not `[a-z0-9]` collapsed to `_`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("migration");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("20240101_init"), "20240101_init");
        assert_eq!(slugify("Add email to Clientes!"), "add_email_to_clientes");
        assert_eq!(slugify("--"), "migration");
        assert_eq!(slugify("año nuevo"), "a_o_nuevo");
    }

    #[test]
    fn test_write_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(tmp.path().join("migrations")).unwrap();
        let writer = ArtifactWriter::new(dir.clone());

        let at: Timestamp = "2024-01-01T09:30:05Z".parse().unwrap();
        let sql = "ALTER TABLE public.clientes ADD COLUMN IF NOT EXISTS email text;";
        let path = writer
            .write_at("add email", Mode::Diff, sql, at)
            .unwrap();

        assert_eq!(path, dir.join("20240101093005_add_email.sql"));
        let contents = std::fs::read_to_string(&path).unwrap();
        let checksum = blake3::hash(sql.as_bytes()).to_hex().to_string();
        assert_eq!(
            contents,
            format!(
                "-- migration: add email\n-- generated: 2024-01-01T09:30:05Z\n-- mode: diff\n-- checksum: blake3:{checksum}\n\n{sql}\n"
            )
        );
    }
}
