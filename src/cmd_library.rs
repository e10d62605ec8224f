//! Commands over stored recordings.

use std::path::Path;

use anyhow::{Context, Result};

use retrace_core::RecordingRepository;

pub(crate) async fn list(repository: &RecordingRepository) -> Result<()> {
    let recordings = repository.list().await?;
    if recordings.is_empty() {
        println!("No recordings");
        return Ok(());
    }

    println!(
        "{:<28} {:<24} {:>7} {:>9} {:<20}",
        "ID", "NAME", "EVENTS", "DURATION", "CREATED"
    );
    println!("{}", "-".repeat(92));
    for recording in recordings {
        println!(
            "{:<28} {:<24} {:>7} {:>9} {:<20}",
            recording.id,
            truncate(&recording.name, 24),
            recording.events.len(),
            format_duration(recording.duration_ms()),
            recording.created_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    Ok(())
}

pub(crate) async fn show(repository: &RecordingRepository, id: &str) -> Result<()> {
    let recording = repository.require(id).await?;
    println!("{}", serde_json::to_string_pretty(&recording)?);
    Ok(())
}

pub(crate) async fn export(
    repository: &RecordingRepository,
    id: &str,
    output: Option<&Path>,
) -> Result<()> {
    let json = repository.export(id).await?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported {id} to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub(crate) async fn import(repository: &RecordingRepository, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let recording = repository.import(&json).await?;
    println!(
        "Imported '{}' as {} ({} events)",
        recording.name,
        recording.id,
        recording.events.len()
    );
    Ok(())
}

pub(crate) async fn delete(repository: &RecordingRepository, id: &str) -> Result<()> {
    repository.delete(id).await?;
    println!("Deleted {id}");
    Ok(())
}

pub(crate) async fn clear(repository: &RecordingRepository) -> Result<()> {
    let removed = repository.clear().await?;
    println!("Removed {removed} recordings");
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn format_duration(ms: i64) -> String {
    let secs = ms / 1000;
    if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}.{}s", secs, (ms % 1000) / 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use retrace_core::MemoryStore;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("login", 24), "login");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0.0s");
        assert_eq!(format_duration(2_450), "2.4s");
        assert_eq!(format_duration(125_000), "2m05s");
    }

    #[tokio::test]
    async fn test_export_import_roundtrip_via_file() {
        let repository = RecordingRepository::new(Arc::new(MemoryStore::new()));
        let recording = repository.draft("login", "https://example.com", Default::default());
        repository.save(&recording).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("login.json");
        export(&repository, &recording.id, Some(&path)).await.unwrap();
        import(&repository, &path).await.unwrap();
        assert_eq!(repository.list().await.unwrap().len(), 2);

        delete(&repository, &recording.id).await.unwrap();
        assert!(delete(&repository, &recording.id).await.is_err());
        clear(&repository).await.unwrap();
        assert!(repository.list().await.unwrap().is_empty());
    }
}
