use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pond_core::chunking::plan::ChunkPlan;
use pond_core::error::{PondError, Result};
use pond_core::journal::EventLog;
use pond_core::transfer::loopback::LoopbackTransfer;
use pond_core::{
    AdapterEvent, FileId, FileRecord, SourceHandle, Stage, UploadCoordinator, UploadNotice,
    UploadOptions,
};

use crate::presentation::cli::OptionArgs;

pub fn resolve_options(args: &OptionArgs) -> Result<UploadOptions> {
    let mut opts = match &args.config {
        Some(path) => {
            let f = File::open(path)?;
            serde_json::from_reader(BufReader::new(f)).map_err(|e| {
                PondError::Format(format!("{}: bad options: {e}", path.display()))
            })?
        }
        None => UploadOptions::default(),
    };
    if let Some(m) = args.max_files {
        opts.max_files = m;
        opts.allow_multiple |= m > 1;
    }
    if let Some(c) = args.chunk_size {
        opts.chunk_size = c;
    }
    if args.retain {
        opts.retain_after_processing = true;
    }
    if !args.accept.is_empty() {
        opts.accepted_file_types = args.accept.clone();
    }
    opts.validate()?;
    Ok(opts)
}

/// Expands directories into the regular files below them, sorted per directory.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in walkdir::WalkDir::new(input).sort_by_file_name() {
                let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
                if entry.file_type().is_file() {
                    out.push(entry.into_path());
                }
            }
        } else {
            out.push(input.clone());
        }
    }
    Ok(out)
}

/// Coordinator plus optional recorder; every event goes through `deliver`.
struct Driver {
    coord: UploadCoordinator,
    log: Option<EventLog>,
}

impl Driver {
    fn deliver(&mut self, event: AdapterEvent) -> Result<Option<FileId>> {
        if let Some(log) = self.log.as_mut() {
            log.append(&event)?;
        }
        let id = self.coord.dispatch(event);
        print_notices(self.coord.take_notices());
        Ok(id)
    }
}

fn print_notices(notices: Vec<UploadNotice>) {
    for n in notices {
        match n {
            UploadNotice::Processed { id, name } => eprintln!("processed: #{id} {name}"),
            UploadNotice::Removed { id, cause } => eprintln!("removed: #{id} ({cause:?})"),
            UploadNotice::Failed { id, reason } => eprintln!("failed: #{id} {reason}"),
            UploadNotice::Rejected { name, reason } => eprintln!("rejected: {name}: {reason}"),
        }
    }
}

fn print_files(files: &[FileRecord], idle_label: &str) {
    if files.is_empty() {
        println!("{idle_label}");
        return;
    }
    for r in files {
        let detail = match &r.stage {
            Stage::Uploading(plan) => {
                format!("{}/{} chunks", plan.acked_count(), plan.total_chunks())
            }
            Stage::Failed(reason) => reason.clone(),
            _ => String::new(),
        };
        println!(
            "#{:<4} {:<10} {:>5.1}%  {:>10}  {:<24} {}",
            r.id,
            r.stage.label(),
            r.progress() * 100.0,
            r.source.size(),
            r.source.name,
            detail
        );
    }
}

fn source_from_path(path: &Path) -> Result<SourceHandle> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SourceHandle::new(name, None, bytes))
}

pub fn handle_upload(
    inputs: Vec<PathBuf>,
    options: OptionArgs,
    reorder: bool,
    cancel: Option<String>,
    record: Option<PathBuf>,
    out: Option<PathBuf>,
) -> Result<()> {
    let opts = resolve_options(&options)?;
    let transfer = Arc::new(LoopbackTransfer::new(opts.chunk_size, reorder));
    let coord = UploadCoordinator::new(opts)?.with_control(transfer.clone());
    let log = record.as_deref().map(EventLog::create).transpose()?;
    let mut driver = Driver { coord, log };

    let mut accepted = Vec::new();
    for path in collect_inputs(&inputs)? {
        let source = source_from_path(&path)?;
        if let Some(id) = driver.deliver(AdapterEvent::Added {
            source: source.clone(),
        })? {
            accepted.push((id, source));
        }
    }

    tracing::info!(accepted = accepted.len(), reorder, "starting loopback transfer");
    let mut queues: Vec<(FileId, bool, VecDeque<AdapterEvent>)> = Vec::new();
    for (id, source) in &accepted {
        let acks = transfer.send(*id, source)?;
        let cancel_me = cancel.as_deref() == Some(source.name.as_str());
        queues.push((*id, cancel_me, acks.into()));
    }

    // Round-robin across files, the way parallel uploads interleave.
    while queues.iter().any(|(_, _, q)| !q.is_empty()) {
        for (id, cancel_me, q) in queues.iter_mut() {
            let Some(ack) = q.pop_front() else {
                continue;
            };
            driver.deliver(ack)?;
            if *cancel_me {
                *cancel_me = false;
                driver.deliver(AdapterEvent::Removed { id: *id })?;
            }
        }
    }

    for (id, _) in &accepted {
        let outcome = transfer.finalize(*id)?;
        driver.deliver(outcome)?;
    }

    let files = driver.coord.current_files();
    print_files(&files, driver.coord.label_idle());

    if let Some(dir) = out {
        std::fs::create_dir_all(&dir)?;
        for r in files.iter().filter(|r| r.stage == Stage::Processed) {
            if !r.source.has_payload() {
                continue;
            }
            let dest = dir.join(&r.source.name);
            std::fs::write(&dest, r.source.bytes())?;
            eprintln!("wrote: {}", dest.display());
        }
    }
    if let Some(log) = &driver.log {
        eprintln!("recorded: {}", log.path().display());
    }
    Ok(())
}

pub fn handle_replay(log: PathBuf, options: OptionArgs) -> Result<()> {
    let opts = resolve_options(&options)?;
    let mut coord = UploadCoordinator::new(opts)?;
    let events = EventLog::read_all(&log)?;
    let n = events.len();
    for event in events {
        coord.dispatch(event);
        print_notices(coord.take_notices());
    }
    eprintln!("replay: {n} events from {}", log.display());
    print_files(&coord.current_files(), coord.label_idle());
    Ok(())
}

pub fn handle_plan(file: PathBuf, chunk_size: u64) -> Result<()> {
    if chunk_size == 0 {
        return Err(PondError::InvalidConfig("chunk size must be positive".into()));
    }
    let bytes = std::fs::read(&file)?;
    let plan = ChunkPlan::for_size(bytes.len() as u64, chunk_size);
    println!(
        "{}: {} bytes, {} chunk(s) of {}",
        file.display(),
        plan.size(),
        plan.total_chunks(),
        plan.chunk_size()
    );
    for r in plan.ranges() {
        let piece = &bytes[r.offset as usize..(r.offset + r.len) as usize];
        println!(
            "#{:<5} off={:<10} len={:<8} blake3={}",
            r.index,
            r.offset,
            r.len,
            blake3::hash(piece).to_hex()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> OptionArgs {
        OptionArgs::default()
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("pond.json");
        std::fs::write(
            &cfg,
            r#"{"allowMultiple":true,"maxFiles":5,"chunkSize":1024,"acceptedFileTypes":["image/*"]}"#,
        )
        .unwrap();

        let opts = resolve_options(&OptionArgs {
            config: Some(cfg.clone()),
            ..args()
        })
        .unwrap();
        assert_eq!(opts.max_files, 5);
        assert_eq!(opts.chunk_size, 1024);
        assert!(!opts.retain_after_processing);

        let opts = resolve_options(&OptionArgs {
            config: Some(cfg),
            chunk_size: Some(16),
            retain: true,
            accept: vec![".txt".into()],
            ..args()
        })
        .unwrap();
        assert_eq!(opts.chunk_size, 16);
        assert!(opts.retain_after_processing);
        assert_eq!(opts.accepted_file_types, vec![".txt".to_string()]);
    }

    #[test]
    fn bad_config_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("pond.json");
        std::fs::write(&cfg, "{not json").unwrap();
        let err = resolve_options(&OptionArgs {
            config: Some(cfg),
            ..args()
        })
        .unwrap_err();
        assert!(matches!(err, PondError::Format(_)));
    }

    #[test]
    fn max_files_flag_enables_multiple() {
        let opts = resolve_options(&OptionArgs {
            max_files: Some(3),
            ..args()
        })
        .unwrap();
        assert!(opts.allow_multiple);
    }

    #[test]
    fn directories_are_walked_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("sub").join("c.txt"), b"c").unwrap();
        let files = collect_inputs(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn upload_writes_retained_files_and_records_a_replayable_log() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        std::fs::create_dir(&input).unwrap();
        std::fs::write(input.join("keep.txt"), vec![b'k'; 40]).unwrap();
        std::fs::write(input.join("skip.txt"), vec![b's'; 40]).unwrap();
        let log = dir.path().join("session.pondlog");
        let out = dir.path().join("out");
        let options = OptionArgs {
            max_files: Some(4),
            chunk_size: Some(7),
            retain: true,
            ..args()
        };

        handle_upload(
            vec![input],
            options.clone(),
            true,
            Some("skip.txt".into()),
            Some(log.clone()),
            Some(out.clone()),
        )
        .unwrap();

        assert_eq!(std::fs::read(out.join("keep.txt")).unwrap(), vec![b'k'; 40]);
        assert!(!out.join("skip.txt").exists());

        let events = EventLog::read_all(&log).unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, AdapterEvent::Removed { id } if *id == FileId(2))));

        let opts = resolve_options(&options).unwrap();
        let mut coord = UploadCoordinator::new(opts).unwrap();
        for e in events {
            coord.dispatch(e);
        }
        let files = coord.current_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].source.name, "keep.txt");
        assert_eq!(files[0].stage, Stage::Processed);
    }
}
