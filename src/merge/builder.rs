use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use indexmap::{IndexMap, IndexSet};
use log::{debug, info, warn};
use parking_lot::Mutex;

use super::cursor::{Cursor, KWayMerge};
use super::item::{merge_group, InterimHeader};
use super::renamer::ChromosomeRenamer;
use super::source::{IntervalSource, SaItemSource};
use crate::error::{ConsistencyError, MergeError};
use crate::sa::{
    DataSourceVersion, GenomeAssembly, SaHeader, SaIntervalLists, SaWriterBuilder,
    DATA_FILE_EXTENSION, INDEX_FILE_SUFFIX,
};
use crate::Result;

/// Default number of chromosomes merged concurrently
pub const DEFAULT_NUM_THREADS: usize = 4;

/// What happens to the remaining chromosomes once one of them fails
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop scheduling new chromosomes after the first failure
    #[default]
    AbortAll,

    /// Keep merging every other chromosome
    Isolate,
}

/// Outcome of one chromosome's merge
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChromosomeSummary {
    /// UCSC name, also the output file stem
    pub chromosome: String,
    pub annotations: usize,
    pub intervals: usize,
    pub ref_minors: usize,
    pub blocks: usize,
    pub elapsed: Duration,
}
impl fmt::Display for ChromosomeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<23}  {:>10}   {:>6}    {:>6}   {:.2?}",
            self.chromosome, self.annotations, self.intervals, self.ref_minors, self.elapsed
        )
    }
}

/// Configures a merge of upstream sources into per-chromosome annotation stores
#[derive(Default)]
pub struct MergeBuilder {
    annotation_sources: Vec<Box<dyn SaItemSource>>,
    interval_sources: Vec<Box<dyn IntervalSource>>,
    misc_source: Option<Box<dyn SaItemSource>>,
    output_dir: Option<PathBuf>,
    threads: Option<usize>,
    failure_policy: FailurePolicy,
    whitelist: Option<Vec<String>>,
    renamer: ChromosomeRenamer,
    writer: SaWriterBuilder,
}
impl MergeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn annotation_source(mut self, source: impl SaItemSource + 'static) -> Self {
        self.annotation_sources.push(Box::new(source));
        self
    }

    #[must_use]
    pub fn interval_source(mut self, source: impl IntervalSource + 'static) -> Self {
        self.interval_sources.push(Box::new(source));
        self
    }

    /// Sets the source of reference-minor flags and global major alleles
    #[must_use]
    pub fn misc_source(mut self, source: impl SaItemSource + 'static) -> Self {
        self.misc_source = Some(Box::new(source));
        self
    }

    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Sets the number of worker threads, clamped to the available CPUs
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    #[must_use]
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Restricts the merge to these chromosomes, given in either naming style
    #[must_use]
    pub fn chromosome_whitelist<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.whitelist = Some(names.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn renamer(mut self, renamer: ChromosomeRenamer) -> Self {
        self.renamer = renamer;
        self
    }

    #[must_use]
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.writer = self.writer.block_size(block_size);
        self
    }

    #[must_use]
    pub fn compression_level(mut self, level: i32) -> Self {
        self.writer = self.writer.compression_level(level);
        self
    }

    /// Validates the sources and prepares the merge.
    ///
    /// Nothing is written until [`SaMerger::merge`] is called.
    pub fn build(self) -> Result<SaMerger> {
        let output_dir = self
            .output_dir
            .ok_or(MergeError::MissingOutputDirectory)?;

        let mut headers: Vec<&InterimHeader> = Vec::new();
        let sa_headers = self.annotation_sources.iter().map(|s| s.header());
        let interval_headers = self.interval_sources.iter().map(|s| s.header());
        for (i, header) in sa_headers.chain(interval_headers).enumerate() {
            headers.push(header.ok_or(ConsistencyError::MissingVersion(i))?);
        }
        let assembly = check_assembly(&headers)?;

        let mut sorted: Vec<&&InterimHeader> = headers.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        info!("Data sources:");
        for header in sorted {
            info!("{header}");
        }
        let data_source_versions: BTreeSet<DataSourceVersion> = headers
            .iter()
            .map(|h| h.data_source_version())
            .collect();

        let mut raw_names: IndexSet<String> = IndexSet::new();
        for source in &self.annotation_sources {
            raw_names.extend(source.ref_names());
        }
        for source in &self.interval_sources {
            raw_names.extend(source.ref_names());
        }
        if let Some(source) = &self.misc_source {
            raw_names.extend(source.ref_names());
        }

        // one job per chromosome, whichever way each source spells it
        let mut jobs: IndexMap<String, Vec<String>> = IndexMap::new();
        for name in raw_names {
            jobs.entry(self.renamer.ensembl_name(&name).to_string())
                .or_default()
                .push(name);
        }
        for (name, spellings) in &jobs {
            if spellings.len() > 1 {
                debug!("Merging {} as chromosome {name}", spellings.join(","));
            }
        }

        if let Some(whitelist) = &self.whitelist {
            info!("Creating annotation stores for: {}", whitelist.join(","));
            let allowed: HashSet<&str> = whitelist
                .iter()
                .map(|name| self.renamer.ensembl_name(name))
                .collect();
            jobs.retain(|name, _| allowed.contains(name.as_str()));
        }

        let threads = self
            .threads
            .unwrap_or(DEFAULT_NUM_THREADS)
            .clamp(1, num_cpus::get().max(1));

        Ok(SaMerger {
            annotation_sources: self.annotation_sources,
            interval_sources: self.interval_sources,
            misc_source: self.misc_source,
            output_dir,
            threads,
            failure_policy: self.failure_policy,
            jobs,
            renamer: self.renamer,
            writer: self.writer,
            assembly,
            data_source_versions,
        })
    }
}

/// All sources must report the same assembly, `Unknown` included
fn check_assembly(headers: &[&InterimHeader]) -> Result<GenomeAssembly> {
    let Some((first, rest)) = headers.split_first() else {
        return Ok(GenomeAssembly::Unknown);
    };
    let expected = first.assembly;
    if let Some(header) = rest.iter().find(|h| h.assembly != expected) {
        return Err(ConsistencyError::AssemblyMismatch {
            expected,
            found: header.assembly,
            source_name: header.name.clone(),
        }
        .into());
    }
    Ok(expected)
}

/// Removes a file, ignoring files that were never created
fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// A validated merge, ready to run
pub struct SaMerger {
    annotation_sources: Vec<Box<dyn SaItemSource>>,
    interval_sources: Vec<Box<dyn IntervalSource>>,
    misc_source: Option<Box<dyn SaItemSource>>,
    output_dir: PathBuf,
    threads: usize,
    failure_policy: FailurePolicy,
    /// Ensembl name to every source spelling of it
    jobs: IndexMap<String, Vec<String>>,
    renamer: ChromosomeRenamer,
    writer: SaWriterBuilder,
    assembly: GenomeAssembly,
    data_source_versions: BTreeSet<DataSourceVersion>,
}
impl SaMerger {
    /// Chromosomes that will be merged by Ensembl name, in source order
    #[must_use]
    pub fn ref_names(&self) -> Vec<&str> {
        self.jobs.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn assembly(&self) -> GenomeAssembly {
        self.assembly
    }

    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.threads
    }

    /// Paths of the data and index file for a UCSC chromosome name
    #[must_use]
    pub fn output_paths(&self, ucsc_name: &str) -> (PathBuf, PathBuf) {
        let data_path = self
            .output_dir
            .join(format!("{ucsc_name}.{DATA_FILE_EXTENSION}"));
        let mut index_path = data_path.as_os_str().to_owned();
        index_path.push(INDEX_FILE_SUFFIX);
        (data_path, PathBuf::from(index_path))
    }

    /// Merges every chromosome on a bounded pool of worker threads.
    ///
    /// Summaries are returned in chromosome order. Each failed chromosome has its
    /// partial output removed and is listed in the returned error.
    pub fn merge(&self) -> Result<Vec<ChromosomeSummary>> {
        fs::create_dir_all(&self.output_dir)?;
        info!(
            "Merging {} chromosomes on {} threads",
            self.jobs.len(),
            self.threads
        );

        let next_job = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let summaries = Mutex::new(Vec::new());
        let failures = Mutex::new(Vec::new());

        let panicked = thread::scope(|scope| {
            let handles: Vec<_> = (0..self.threads)
                .map(|_| {
                    scope.spawn(|| loop {
                        if abort.load(Ordering::Relaxed) {
                            break;
                        }
                        let job = next_job.fetch_add(1, Ordering::Relaxed);
                        let Some((ref_name, _)) = self.jobs.get_index(job) else {
                            break;
                        };
                        match self.merge_chromosome(ref_name) {
                            Ok(summary) => {
                                info!("{summary}");
                                summaries.lock().push((job, summary));
                            }
                            Err(e) => {
                                warn!("Failed to merge chromosome {ref_name}: {e}");
                                failures.lock().push((job, ref_name.clone(), e.to_string()));
                                if self.failure_policy == FailurePolicy::AbortAll {
                                    abort.store(true, Ordering::Relaxed);
                                }
                            }
                        }
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(thread::ScopedJoinHandle::join)
                .fold(false, |panicked, result| panicked | result.is_err())
        });
        if panicked {
            return Err(MergeError::WorkerPanicked.into());
        }

        let mut failures = failures.into_inner();
        if !failures.is_empty() {
            failures.sort_by_key(|(job, _, _)| *job);
            let failed = failures
                .into_iter()
                .map(|(_, name, message)| (name, message))
                .collect();
            return Err(MergeError::JobsFailed { failed }.into());
        }

        let mut summaries = summaries.into_inner();
        summaries.sort_by_key(|(job, _)| *job);
        Ok(summaries.into_iter().map(|(_, summary)| summary).collect())
    }

    /// Merges one chromosome, removing its output files on failure.
    ///
    /// `ref_name` may use either naming style; items are pulled from every source
    /// spelling of the chromosome.
    pub fn merge_chromosome(&self, ref_name: &str) -> Result<ChromosomeSummary> {
        let ensembl_name = self.renamer.ensembl_name(ref_name);
        let spellings: Vec<&str> = match self.jobs.get(ensembl_name) {
            Some(spellings) => spellings.iter().map(String::as_str).collect(),
            None => vec![ensembl_name],
        };
        let ucsc_name = self.renamer.ucsc_name(ensembl_name);
        let (data_path, index_path) = self.output_paths(ucsc_name);

        let result = self.write_chromosome(&spellings, ucsc_name, &data_path, &index_path);
        if result.is_err() {
            remove_if_exists(&data_path)?;
            remove_if_exists(&index_path)?;
        }
        result
    }

    fn write_chromosome(
        &self,
        spellings: &[&str],
        ucsc_name: &str,
        data_path: &Path,
        index_path: &Path,
    ) -> Result<ChromosomeSummary> {
        let start = Instant::now();

        let header = SaHeader::builder(ucsc_name)
            .assembly(self.assembly)
            .data_sources(self.data_source_versions.iter().cloned())
            .build();

        let mut intervals = Vec::new();
        for source in &self.interval_sources {
            let names = source.ref_names();
            for &spelling in spellings {
                if !names.iter().any(|name| name == spelling) {
                    continue;
                }
                for interval in source.intervals(spelling)? {
                    intervals.push(interval?);
                }
            }
        }
        let intervals = SaIntervalLists::from_intervals(intervals);

        let mut cursors = Vec::new();
        for source in self.annotation_sources.iter().chain(self.misc_source.iter()) {
            let names = source.ref_names();
            for &spelling in spellings {
                if names.iter().any(|name| name == spelling) {
                    cursors.push(Cursor::new(spelling, source.items(spelling)?)?);
                }
            }
        }
        let merge = KWayMerge::new(cursors);

        let data = BufWriter::new(File::create(data_path)?);
        let index = BufWriter::new(File::create(index_path)?);
        let mut writer = self.writer.build(data, index, &header, &intervals)?;
        for group in merge {
            let (position, items) = group?;
            writer.write(merge_group(position, items))?;
        }
        writer.finish()?;

        Ok(ChromosomeSummary {
            chromosome: ucsc_name.to_string(),
            annotations: writer.records_written(),
            intervals: intervals.len(),
            ref_minors: writer.ref_minor_count(),
            blocks: writer.num_blocks(),
            elapsed: start.elapsed(),
        })
    }
}
