use std::fmt;

/// One record that failed inside a pass. Collected per batch and logged
/// once at the end, never silently discarded.
#[derive(Debug, Clone)]
pub struct ItemFailure {
    pub unique_id: String,
    pub error: String,
}

/// Stats from a requeue pass.
#[derive(Debug, Default)]
pub struct RequeueStats {
    pub missing: u64,
    pub published: u64,
    pub failed: u64,
}

impl fmt::Display for RequeueStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Requeue Pass Complete ===")?;
        writeln!(f, "Missing records:   {}", self.missing)?;
        writeln!(f, "Published:         {}", self.published)?;
        writeln!(f, "Publish failures:  {}", self.failed)?;
        Ok(())
    }
}

/// Stats from a registry pass.
#[derive(Debug, Default)]
pub struct RegisterStats {
    pub missing: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub failed: u64,
}

impl fmt::Display for RegisterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Registry Pass Complete ===")?;
        writeln!(f, "Missing records:   {}", self.missing)?;
        writeln!(f, "Entries inserted:  {}", self.inserted)?;
        writeln!(f, "Duplicates skipped:{}", self.duplicates)?;
        writeln!(f, "Insert failures:   {}", self.failed)?;
        Ok(())
    }
}

/// Stats from a master-update pass.
#[derive(Debug, Default)]
pub struct MasterStats {
    pub updated: u64,
    pub inserted: u64,
    pub stale: u64,
    pub total_records: u64,
}

impl fmt::Display for MasterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Master Update Complete ===")?;
        writeln!(f, "Records updated:   {}", self.updated)?;
        writeln!(f, "Records inserted:  {}", self.inserted)?;
        writeln!(f, "Marked stale:      {}", self.stale)?;
        writeln!(f, "Master records:    {}", self.total_records)?;
        Ok(())
    }
}
