use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::model::Content;
use crate::core::target::OutputTarget;

/// Writes `content` to a file (created or truncated, and closed before
/// returning) or to an open stream (flushed, left open).
pub fn write_content(target: &mut OutputTarget<'_>, content: &Content) -> Result<()> {
    match target {
        OutputTarget::Path(name) => write_file(Path::new(name.as_str()), content)?,
        OutputTarget::StructuredPath(path) => write_file(path, content)?,
        OutputTarget::Stream(writer) => {
            writer
                .write_all(content.as_bytes())
                .with_context(|| "failed to write to output stream")?;
            writer.flush()?;
        }
    }
    Ok(())
}

fn write_file(path: &Path, content: &Content) -> Result<()> {
    fs::write(path, content.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_text_to_string_path() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("chart.svg");
        let mut target = OutputTarget::path(path.to_string_lossy());

        write_content(&mut target, &Content::Text("<svg/>".into()))?;

        assert_eq!(fs::read_to_string(&path)?, "<svg/>");
        Ok(())
    }

    #[test]
    fn overwrites_binary_at_structured_path() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("chart.png");
        fs::write(&path, b"previous contents that are longer")?;
        let mut target = OutputTarget::structured(&path);

        write_content(&mut target, &Content::Binary(vec![0x89, b'P', b'N', b'G']))?;

        assert_eq!(fs::read(&path)?, vec![0x89, b'P', b'N', b'G']);
        Ok(())
    }

    #[test]
    fn stream_stays_usable() -> Result<()> {
        let mut sink: Vec<u8> = Vec::new();
        {
            let mut target = OutputTarget::stream(&mut sink);
            write_content(&mut target, &Content::Text("first".into()))?;
            write_content(&mut target, &Content::Text(" second".into()))?;
        }
        sink.extend_from_slice(b"!");
        assert_eq!(sink, b"first second!");
        Ok(())
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut target = OutputTarget::structured(dir.path().join("nope/chart.json"));
        let err = write_content(&mut target, &Content::Text("{}".into())).unwrap_err();
        assert!(err.to_string().contains("failed to write"));
    }
}
