use crate::domain::SourceHandle;
use crate::error::{PondError, Result};

/// A check run on every file before it enters the session.
pub trait AcceptFilter: Send + Sync {
    fn name(&self) -> &str;
    /// `Err(reason)` rejects the file.
    fn check(&self, source: &SourceHandle) -> std::result::Result<(), String>;
}

/// Filters run in registration order; the first rejection wins.
#[derive(Default)]
pub struct FilterPipeline {
    filters: Vec<Box<dyn AcceptFilter>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: Box<dyn AcceptFilter>) {
        self.filters.push(filter);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|f| f.name())
    }

    pub fn check(&self, source: &SourceHandle) -> Result<()> {
        for f in &self.filters {
            if let Err(reason) = f.check(source) {
                tracing::debug!(filter = f.name(), file = %source.name, %reason, "filter rejected file");
                return Err(PondError::Rejected {
                    name: source.name.clone(),
                    reason,
                });
            }
        }
        Ok(())
    }
}

pub mod mime;

#[cfg(test)]
mod tests {
    use super::*;

    struct MaxSize(u64);

    impl AcceptFilter for MaxSize {
        fn name(&self) -> &str {
            "max-size"
        }

        fn check(&self, source: &SourceHandle) -> std::result::Result<(), String> {
            if source.size() > self.0 {
                return Err(format!("{} bytes is over {}", source.size(), self.0));
            }
            Ok(())
        }
    }

    struct Nothing;

    impl AcceptFilter for Nothing {
        fn name(&self) -> &str {
            "nothing"
        }

        fn check(&self, _source: &SourceHandle) -> std::result::Result<(), String> {
            Err("closed".into())
        }
    }

    #[test]
    fn empty_pipeline_accepts() {
        let p = FilterPipeline::new();
        assert!(p.check(&SourceHandle::new("a.bin", None, vec![0u8; 4])).is_ok());
    }

    #[test]
    fn first_rejection_wins() {
        let mut p = FilterPipeline::new();
        p.push(Box::new(MaxSize(2)));
        p.push(Box::new(Nothing));
        assert_eq!(p.names().collect::<Vec<_>>(), vec!["max-size", "nothing"]);

        let err = p
            .check(&SourceHandle::new("big.bin", None, vec![0u8; 4]))
            .unwrap_err();
        match err {
            PondError::Rejected { name, reason } => {
                assert_eq!(name, "big.bin");
                assert!(reason.contains("over 2"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = p
            .check(&SourceHandle::new("small.bin", None, vec![0u8; 1]))
            .unwrap_err();
        assert!(matches!(err, PondError::Rejected { reason, .. } if reason == "closed"));
    }
}
