//! Location resolution: from sensor tags to concrete lake file paths.
//!
//! Resolution runs in two steps. First the sensor directories are found, via
//! the asset catalog (tags grouped by asset) or a caller-supplied base
//! directory. Then each sensor directory is probed per partition, trying the
//! configured file types in priority order; the first existing,
//! size-compliant candidate wins.
//!
//! Absence is routine at every level and never fails the whole lookup by
//! default: a tag without a directory resolves to a missing [`TagLocations`],
//! a partition without a file is simply not in the map. Configuration
//! problems (unknown asset, bad worker count) are fatal and raised before any
//! storage I/O.

use std::{collections::HashMap, sync::Arc};

use futures::{StreamExt, stream};
use log::{debug, info, warn};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    assets::AssetCatalog,
    error::{
        ConfigError, InvalidWorkerCountSnafu, MissingAssetSnafu, ReaderMismatchSnafu,
        UnknownAssetSnafu,
    },
    file_format::FileFormat,
    partition::Partition,
    probe::{FileTypeProbe, ProbeError, load_probes},
    storage::{DataLakeStorage, StorageError},
};

/// Reader kind this resolver understands in asset-catalog entries.
pub const TIME_SERIES_READER_NAME: &str = "time_series_reader";

/// Default upper bound on usable file size: 1 GiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1 << 30;

/// Characters kept literal when quoting a tag name into a path segment.
///
/// Everything non-alphanumeric is percent-encoded except space, `_`, `.`,
/// `-` and `~`, matching how the files were laid down.
const TAG_NAME_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b' ')
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

/// Quote a sensor tag name for use as a directory or file name segment.
pub fn quote_tag_name(name: &str) -> String {
    utf8_percent_encode(name, TAG_NAME_SET).to_string()
}

/// Errors raised during location resolution.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LookupError {
    /// Caller-supplied configuration was rejected.
    #[snafu(display("Lookup configuration error: {source}"))]
    Config {
        /// The underlying configuration error.
        source: ConfigError,
    },

    /// A probe was used with partitions of the wrong granularity.
    #[snafu(display("Probe error: {source}"))]
    Probe {
        /// The underlying probe error.
        source: ProbeError,
    },

    /// The storage backend failed with something other than absence.
    #[snafu(display("Storage failure at {path}: {source}"))]
    Storage {
        /// The lake path the failure occurred at.
        path: String,
        /// The underlying storage error.
        source: StorageError,
    },
}

/// One sensor tag, optionally bound to an asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorTag {
    /// The sensor name as it appears in the lake layout (unquoted).
    pub name: String,
    /// The asset this sensor belongs to, if known.
    pub asset: Option<String>,
}

impl SensorTag {
    /// Create a tag without an asset binding.
    pub fn new(name: impl Into<String>) -> Self {
        SensorTag { name: name.into(), asset: None }
    }

    /// Create a tag bound to an asset.
    pub fn with_asset(name: impl Into<String>, asset: impl Into<String>) -> Self {
        SensorTag { name: name.into(), asset: Some(asset.into()) }
    }
}

/// One resolved file: where it is and how to decode it.
#[derive(Debug, Clone)]
pub struct Location {
    /// Full lake path of the file.
    pub path: String,
    /// Decoder for the file's format.
    pub file_format: Arc<dyn FileFormat>,
    /// The partition the file covers, when resolved per partition.
    pub partition: Option<Partition>,
}

/// All resolved locations for one tag.
///
/// `locations` distinguishes two kinds of absence: `None` means the tag's
/// directory was not found at all, `Some` with an empty map means the
/// directory exists but holds no usable file for any requested partition.
#[derive(Debug, Clone)]
pub struct TagLocations {
    tag: SensorTag,
    locations: Option<HashMap<Partition, Location>>,
}

impl TagLocations {
    /// Wrap resolved locations for a tag.
    pub fn new(tag: SensorTag, locations: HashMap<Partition, Location>) -> Self {
        TagLocations { tag, locations: Some(locations) }
    }

    /// The result for a tag whose directory was not found.
    pub fn missing(tag: SensorTag) -> Self {
        TagLocations { tag, locations: None }
    }

    /// The tag these locations belong to.
    pub fn tag(&self) -> &SensorTag {
        &self.tag
    }

    /// Whether the tag's directory was found at all.
    pub fn available(&self) -> bool {
        self.locations.is_some()
    }

    /// Partitions with a resolved file, ascending.
    pub fn partitions(&self) -> Vec<Partition> {
        let mut partitions: Vec<Partition> = self
            .locations
            .as_ref()
            .map(|map| map.keys().copied().collect())
            .unwrap_or_default();
        partitions.sort_by(|a, b| a.ordering(b));
        partitions
    }

    /// The resolved location for one partition.
    pub fn get_location(&self, partition: &Partition) -> Option<&Location> {
        self.locations.as_ref().and_then(|map| map.get(partition))
    }

    /// Iterate resolved `(partition, location)` pairs in ascending partition
    /// order.
    pub fn iter(&self) -> impl Iterator<Item = (Partition, &Location)> + '_ {
        let mut pairs: Vec<(Partition, &Location)> = self
            .locations
            .as_ref()
            .map(|map| map.iter().map(|(partition, location)| (*partition, location)).collect())
            .unwrap_or_default();
        pairs.sort_by(|a, b| a.0.ordering(&b.0));
        pairs.into_iter()
    }
}

impl PartialEq for TagLocations {
    fn eq(&self, other: &Self) -> bool {
        if self.tag != other.tag {
            return false;
        }
        match (&self.locations, &other.locations) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(partition, location)| {
                        b.get(partition).is_some_and(|o| o.path == location.path)
                    })
            }
            _ => false,
        }
    }
}

/// Partition-aware resolver from sensor tags to lake file locations.
#[derive(Debug)]
pub struct TagLookup {
    storage: Arc<DataLakeStorage>,
    probes: Vec<Arc<dyn FileTypeProbe>>,
    max_file_size: Option<u64>,
    fail_fast: bool,
}

impl TagLookup {
    /// Create a resolver over `storage` with the default probe set, the
    /// default file-size bound, and per-tag degradation on storage failures.
    pub fn create(storage: Arc<DataLakeStorage>) -> Result<Self, ConfigError> {
        Ok(TagLookup {
            storage,
            probes: load_probes(None)?,
            max_file_size: Some(DEFAULT_MAX_FILE_SIZE),
            fail_fast: false,
        })
    }

    /// Replace the probe set (priority order preserved).
    pub fn with_probes(mut self, probes: Vec<Arc<dyn FileTypeProbe>>) -> Self {
        self.probes = probes;
        self
    }

    /// Override the file-size bound; `None` disables it.
    pub fn with_max_file_size(mut self, max_file_size: Option<u64>) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Make per-tag storage failures abort the whole lookup instead of
    /// degrading that tag to a missing result.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// The storage this resolver reads.
    pub fn storage(&self) -> &Arc<DataLakeStorage> {
        &self.storage
    }

    /// Find the sensor directories for `tags` under `base_dir`.
    ///
    /// One directory listing serves all tags; directory names are matched
    /// case-sensitively against the quoted tag names. Tags without a matching
    /// directory yield `None`. Output order follows input order.
    pub async fn tag_dirs_lookup(
        &self,
        base_dir: &str,
        tags: &[SensorTag],
    ) -> Result<Vec<(SensorTag, Option<String>)>, LookupError> {
        let entries = self
            .storage
            .ls(base_dir)
            .await
            .context(StorageSnafu { path: base_dir })?;

        let mut dirs: HashMap<&str, &str> = HashMap::new();
        for entry in &entries {
            if entry.is_dir {
                let (_, name) = self.storage.split(&entry.path);
                dirs.insert(name, entry.path.as_str());
            }
        }

        Ok(tags
            .iter()
            .map(|tag| {
                let quoted = quote_tag_name(&tag.name);
                (tag.clone(), dirs.get(quoted.as_str()).map(|path| path.to_string()))
            })
            .collect())
    }

    /// Resolve the file for each partition inside one sensor directory.
    ///
    /// Per partition, probes are tried in priority order; probes of the wrong
    /// granularity are skipped. The first candidate that exists settles the
    /// partition: within bounds it is recorded, oversized it is rejected and
    /// the partition left unresolved. A candidate that does not exist falls
    /// through to the next probe.
    ///
    /// The result always carries a map (possibly empty); `None` is reserved
    /// for a missing directory, which is the caller's call to make.
    pub async fn files_lookup(
        &self,
        tag_dir: &str,
        tag: &SensorTag,
        partitions: &[Partition],
    ) -> Result<TagLocations, LookupError> {
        let quoted = quote_tag_name(&tag.name);
        let mut locations = HashMap::new();

        for partition in partitions {
            'probes: for probe in &self.probes {
                if !probe.check_partition(partition) {
                    continue;
                }
                let candidates = probe
                    .relative_paths(&quoted, std::slice::from_ref(partition))
                    .context(ProbeSnafu)?;
                for (partition, rel) in candidates {
                    let path = self.storage.join(tag_dir, &rel);
                    match self.storage.info(&path).await {
                        Ok(file_info) => {
                            if self.max_file_size.is_some_and(|max| file_info.size > max) {
                                debug!(
                                    "Skipping oversized file {path} ({} bytes) for tag '{}'",
                                    file_info.size, tag.name
                                );
                            } else {
                                locations.insert(
                                    partition,
                                    Location {
                                        path,
                                        file_format: Arc::clone(probe.file_format()),
                                        partition: Some(partition),
                                    },
                                );
                            }
                            // The file settles this partition either way.
                            break 'probes;
                        }
                        Err(e) if e.is_not_found() => continue,
                        Err(e) => return Err(e).context(StorageSnafu { path }),
                    }
                }
            }
        }
        Ok(TagLocations::new(tag.clone(), locations))
    }

    /// Find the sensor directory for each tag.
    ///
    /// With a `base_dir` override every tag is looked up there directly.
    /// Otherwise tags are grouped by asset and each group is resolved under
    /// its catalog directory; catalog problems (missing asset binding,
    /// unknown asset, wrong reader kind) fail before any storage I/O. Output
    /// order follows input order in both modes.
    pub async fn asset_dirs_lookup(
        &self,
        catalog: &AssetCatalog,
        tags: &[SensorTag],
        base_dir: Option<&str>,
    ) -> Result<Vec<(SensorTag, Option<String>)>, LookupError> {
        if let Some(base_dir) = base_dir {
            return self.tag_dirs_lookup(base_dir, tags).await;
        }

        let storage_name = self.storage.name();

        // Validate every binding up front, grouping tags by asset in
        // first-seen order.
        let mut groups: Vec<(String, String, Vec<SensorTag>)> = Vec::new();
        for tag in tags {
            let asset = tag
                .asset
                .as_deref()
                .filter(|a| !a.is_empty())
                .ok_or_else(|| MissingAssetSnafu { tag: tag.name.clone() }.build())
                .context(ConfigSnafu)?;
            match groups.iter_mut().find(|(name, _, _)| name == asset) {
                Some((_, _, members)) => members.push(tag.clone()),
                None => {
                    let spec = catalog
                        .get_path(storage_name, asset)
                        .ok_or_else(|| {
                            UnknownAssetSnafu { asset, storage: storage_name }.build()
                        })
                        .context(ConfigSnafu)?;
                    if spec.reader != TIME_SERIES_READER_NAME {
                        return Err(ReaderMismatchSnafu {
                            expected: TIME_SERIES_READER_NAME,
                            actual: spec.reader.clone(),
                        }
                        .build())
                        .context(ConfigSnafu);
                    }
                    let dir = spec.full_path(&self.storage);
                    groups.push((asset.to_string(), dir, vec![tag.clone()]));
                }
            }
        }

        let mut by_tag: HashMap<SensorTag, Option<String>> = HashMap::new();
        for (_, dir, members) in &groups {
            for (tag, found) in self.tag_dirs_lookup(dir, members).await? {
                by_tag.insert(tag, found);
            }
        }

        Ok(tags
            .iter()
            .map(|tag| (tag.clone(), by_tag.get(tag).cloned().flatten()))
            .collect())
    }

    /// Resolve locations for every tag over `partitions`.
    ///
    /// `workers` bounds concurrent per-tag resolution; `1` runs sequentially
    /// and anything below is a configuration error. Output order always
    /// matches input order regardless of the worker count.
    ///
    /// Unless `fail_fast` is set, a storage failure while probing one tag
    /// degrades that tag to a missing result with a warning.
    pub async fn lookup(
        &self,
        catalog: &AssetCatalog,
        tags: &[SensorTag],
        partitions: &[Partition],
        workers: usize,
        base_dir: Option<&str>,
    ) -> Result<Vec<TagLocations>, LookupError> {
        if workers < 1 {
            return Err(InvalidWorkerCountSnafu { workers }.build()).context(ConfigSnafu);
        }

        let dirs = self.asset_dirs_lookup(catalog, tags, base_dir).await?;

        if workers == 1 {
            let mut results = Vec::with_capacity(dirs.len());
            for (tag, dir) in dirs {
                results.push(self.resolve_unit(tag, dir, partitions).await?);
            }
            return Ok(results);
        }

        let results: Vec<Result<TagLocations, LookupError>> = stream::iter(dirs)
            .map(|(tag, dir)| self.resolve_unit(tag, dir, partitions))
            .buffered(workers)
            .collect()
            .await;
        results.into_iter().collect()
    }

    async fn resolve_unit(
        &self,
        tag: SensorTag,
        dir: Option<String>,
        partitions: &[Partition],
    ) -> Result<TagLocations, LookupError> {
        let Some(dir) = dir else {
            info!("No sensor directory found for tag '{}'", tag.name);
            return Ok(TagLocations::missing(tag));
        };
        match self.files_lookup(&dir, &tag, partitions).await {
            Ok(locations) => Ok(locations),
            Err(e) if !self.fail_fast => {
                warn!("Degrading tag '{}' to missing after lookup failure: {e}", tag.name);
                Ok(TagLocations::missing(tag))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assets::AssetPathSpec,
        file_format::test_fixtures::parquet_bytes,
        storage::write_fixture,
    };
    use tempfile::TempDir;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn month(year: i32, month: u32) -> Partition {
        Partition::Month { year, month }
    }

    fn lookup_over(tmp: &TempDir) -> TagLookup {
        TagLookup::create(Arc::new(DataLakeStorage::local(tmp.path()))).unwrap()
    }

    fn catalog_for(base: &str) -> AssetCatalog {
        let mut catalog = AssetCatalog::new();
        catalog.insert(
            "local",
            "plant-a",
            AssetPathSpec::new(TIME_SERIES_READER_NAME, base, "plant-a"),
        );
        catalog
    }

    async fn seed_monthly(tmp: &TempDir, tag: &str, year: i32, mon: u32) -> TestResult {
        let rel = format!(
            "raw/plant-a/{tag}/parquet/{year}/{tag}_{year}{mon:02}.parquet"
        );
        write_fixture(tmp.path(), &rel, &parquet_bytes(&[(0, 1.0, 0)])).await?;
        Ok(())
    }

    #[test]
    fn tag_names_are_quoted_like_the_lake_layout() {
        assert_eq!(quote_tag_name("tag_1.A-b~"), "tag_1.A-b~");
        assert_eq!(quote_tag_name("tag 1"), "tag 1");
        assert_eq!(quote_tag_name("tag/1#x"), "tag%2F1%23x");
    }

    #[tokio::test]
    async fn tag_dirs_lookup_matches_quoted_names() -> TestResult {
        let tmp = TempDir::new()?;
        write_fixture(tmp.path(), "base/tag1/.keep", b"").await?;
        write_fixture(tmp.path(), "base/tag%2F2/.keep", b"").await?;
        write_fixture(tmp.path(), "base/loose.txt", b"x").await?;

        let lookup = lookup_over(&tmp);
        let tags = vec![
            SensorTag::new("tag1"),
            SensorTag::new("tag/2"),
            SensorTag::new("absent"),
        ];
        let dirs = lookup.tag_dirs_lookup("base", &tags).await?;

        assert_eq!(dirs[0].1.as_deref(), Some("base/tag1"));
        assert_eq!(dirs[1].1.as_deref(), Some("base/tag%2F2"));
        assert_eq!(dirs[2].1, None);
        Ok(())
    }

    #[tokio::test]
    async fn files_lookup_finds_present_months_only() -> TestResult {
        let tmp = TempDir::new()?;
        seed_monthly(&tmp, "tag1", 2020, 2).await?;
        seed_monthly(&tmp, "tag1", 2020, 4).await?;

        let lookup = lookup_over(&tmp);
        let partitions = [month(2020, 2), month(2020, 3), month(2020, 4)];
        let locations = lookup
            .files_lookup("raw/plant-a/tag1", &SensorTag::new("tag1"), &partitions)
            .await?;

        assert!(locations.available());
        assert_eq!(locations.partitions(), vec![month(2020, 2), month(2020, 4)]);
        assert!(locations.get_location(&month(2020, 3)).is_none());
        let feb = locations.get_location(&month(2020, 2)).unwrap();
        assert_eq!(feb.path, "raw/plant-a/tag1/parquet/2020/tag1_202002.parquet");
        assert_eq!(feb.partition, Some(month(2020, 2)));
        Ok(())
    }

    #[tokio::test]
    async fn files_lookup_empty_directory_is_empty_not_missing() -> TestResult {
        let tmp = TempDir::new()?;
        write_fixture(tmp.path(), "raw/plant-a/tag1/.keep", b"").await?;

        let lookup = lookup_over(&tmp);
        let locations = lookup
            .files_lookup("raw/plant-a/tag1", &SensorTag::new("tag1"), &[month(2020, 1)])
            .await?;

        assert!(locations.available());
        assert!(locations.partitions().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn probe_priority_prefers_parquet_over_csv() -> TestResult {
        let tmp = TempDir::new()?;
        // The same year is covered by both a yearly parquet and a yearly csv.
        write_fixture(
            tmp.path(),
            "raw/plant-a/tag1/parquet/tag1_2020.parquet",
            &parquet_bytes(&[(0, 1.0, 0)]),
        )
        .await?;
        write_fixture(tmp.path(), "raw/plant-a/tag1/tag1_2020.csv", b"tag1;1.0;2020-01-01 00:00:00;0\n")
            .await?;

        let lookup = lookup_over(&tmp);
        let locations = lookup
            .files_lookup("raw/plant-a/tag1", &SensorTag::new("tag1"), &[Partition::Year(2020)])
            .await?;

        let loc = locations.get_location(&Partition::Year(2020)).unwrap();
        assert_eq!(loc.path, "raw/plant-a/tag1/parquet/tag1_2020.parquet");
        assert_eq!(loc.file_format.extension(), ".parquet");
        Ok(())
    }

    #[tokio::test]
    async fn reordered_probes_change_the_winner() -> TestResult {
        let tmp = TempDir::new()?;
        write_fixture(
            tmp.path(),
            "raw/plant-a/tag1/parquet/tag1_2020.parquet",
            &parquet_bytes(&[(0, 1.0, 0)]),
        )
        .await?;
        write_fixture(tmp.path(), "raw/plant-a/tag1/tag1_2020.csv", b"tag1;1.0;2020-01-01 00:00:00;0\n")
            .await?;

        let lookup =
            lookup_over(&tmp).with_probes(load_probes(Some(&["csv", "yearly_parquet"]))?);
        let locations = lookup
            .files_lookup("raw/plant-a/tag1", &SensorTag::new("tag1"), &[Partition::Year(2020)])
            .await?;

        let loc = locations.get_location(&Partition::Year(2020)).unwrap();
        assert_eq!(loc.path, "raw/plant-a/tag1/tag1_2020.csv");
        Ok(())
    }

    #[tokio::test]
    async fn oversized_file_rejects_the_partition() -> TestResult {
        let tmp = TempDir::new()?;
        // An oversized yearly parquet settles the partition even though an
        // in-bounds csv exists further down the priority order.
        write_fixture(
            tmp.path(),
            "raw/plant-a/tag1/parquet/tag1_2020.parquet",
            &parquet_bytes(&[(0, 1.0, 0)]),
        )
        .await?;
        write_fixture(tmp.path(), "raw/plant-a/tag1/tag1_2020.csv", b"tag1;1.0;2020-01-01 00:00:00;0\n")
            .await?;

        let lookup = lookup_over(&tmp).with_max_file_size(Some(16));
        let locations = lookup
            .files_lookup("raw/plant-a/tag1", &SensorTag::new("tag1"), &[Partition::Year(2020)])
            .await?;

        assert!(locations.available());
        assert!(locations.partitions().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn asset_errors_fail_before_io() -> TestResult {
        // Storage root does not exist: a config error must surface first.
        let storage = Arc::new(DataLakeStorage::local("/nonexistent-lake-root"));
        let lookup = TagLookup::create(storage)?;
        let catalog = catalog_for("raw");

        let err = lookup
            .asset_dirs_lookup(&catalog, &[SensorTag::new("tag1")], None)
            .await
            .expect_err("tag has no asset");
        assert!(matches!(
            err,
            LookupError::Config { source: ConfigError::MissingAsset { .. } }
        ));

        let err = lookup
            .asset_dirs_lookup(&catalog, &[SensorTag::with_asset("tag1", "plant-b")], None)
            .await
            .expect_err("asset not in catalog");
        assert!(matches!(
            err,
            LookupError::Config { source: ConfigError::UnknownAsset { .. } }
        ));

        let mut bad_reader = AssetCatalog::new();
        bad_reader.insert("local", "plant-a", AssetPathSpec::new("csv_reader", "raw", "plant-a"));
        let err = lookup
            .asset_dirs_lookup(&bad_reader, &[SensorTag::with_asset("tag1", "plant-a")], None)
            .await
            .expect_err("wrong reader kind");
        assert!(matches!(
            err,
            LookupError::Config { source: ConfigError::ReaderMismatch { .. } }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn lookup_order_is_stable_across_worker_counts() -> TestResult {
        let tmp = TempDir::new()?;
        for tag in ["tag1", "tag2", "tag3", "tag4"] {
            seed_monthly(&tmp, tag, 2020, 1).await?;
        }
        let lookup = lookup_over(&tmp);
        let catalog = catalog_for("raw");
        let tags: Vec<SensorTag> = ["tag1", "tag4", "tag2", "absent", "tag3"]
            .into_iter()
            .map(|name| SensorTag::with_asset(name, "plant-a"))
            .collect();
        let partitions = [month(2020, 1)];

        let sequential = lookup.lookup(&catalog, &tags, &partitions, 1, None).await?;
        assert_eq!(sequential.len(), tags.len());
        for (result, tag) in sequential.iter().zip(&tags) {
            assert_eq!(result.tag(), tag);
        }
        assert!(!sequential[3].available());
        assert!(sequential[0].available());

        for workers in [2, 10] {
            let concurrent = lookup.lookup(&catalog, &tags, &partitions, workers, None).await?;
            assert_eq!(concurrent, sequential);
        }
        Ok(())
    }

    #[tokio::test]
    async fn zero_workers_is_a_config_error() -> TestResult {
        let tmp = TempDir::new()?;
        let lookup = lookup_over(&tmp);
        let catalog = catalog_for("raw");

        let err = lookup
            .lookup(&catalog, &[SensorTag::with_asset("tag1", "plant-a")], &[], 0, None)
            .await
            .expect_err("zero workers");
        assert!(matches!(
            err,
            LookupError::Config { source: ConfigError::InvalidWorkerCount { workers: 0 } }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn base_dir_override_bypasses_the_catalog() -> TestResult {
        let tmp = TempDir::new()?;
        write_fixture(
            tmp.path(),
            "elsewhere/tag1/parquet/2020/tag1_202001.parquet",
            &parquet_bytes(&[(0, 1.0, 0)]),
        )
        .await?;

        let lookup = lookup_over(&tmp);
        // Tag has no asset; the override makes that irrelevant.
        let results = lookup
            .lookup(
                &AssetCatalog::new(),
                &[SensorTag::new("tag1")],
                &[month(2020, 1)],
                1,
                Some("elsewhere"),
            )
            .await?;

        assert!(results[0].available());
        assert_eq!(
            results[0].get_location(&month(2020, 1)).unwrap().path,
            "elsewhere/tag1/parquet/2020/tag1_202001.parquet"
        );
        Ok(())
    }
}
