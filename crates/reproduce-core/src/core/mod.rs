// crates/reproduce-core/src/core/mod.rs
// ============================================================================
// Module: Reproduce Core Types
// Description: Data model for specs, manifests, source locators, and verdicts.
// Purpose: Provide the validated, serializable types the engine reasons about.
// Dependencies: serde, time, url
// ============================================================================

//! ## Overview
//! Core types are pure data plus the two policy gates of the pipeline: the
//! spec validator and the source locator resolver. Nothing in this module
//! performs I/O.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod integrity;
pub mod locator;
pub mod manifest;
pub mod result;
pub mod spec;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use integrity::digests_match;
pub use integrity::integrity_for_bytes;
pub use integrity::integrity_for_reader;
pub use locator::LocatorRejection;
pub use locator::SourceHost;
pub use locator::SourceLocator;
pub use locator::resolve_source;
pub use manifest::Attestations;
pub use manifest::Dist;
pub use manifest::Manifest;
pub use manifest::Repository;
pub use result::CacheEntry;
pub use result::PackageRecord;
pub use result::ReproductionResult;
pub use result::SourceRecord;
pub use result::migrate_entry;
pub use result::parse_tarball_url;
pub use result::platform_arch;
pub use result::platform_os;
pub use spec::RegistrySpec;
pub use spec::SUPPORTED_REGISTRY;
pub use spec::SpecRejection;
pub use spec::VersionSelector;
pub use spec::validate_package_name;
pub use spec::validate_spec;
