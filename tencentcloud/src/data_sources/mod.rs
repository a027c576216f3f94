//! Data sources

pub mod data_source_eips;
pub mod data_source_tse_groups;

pub use data_source_eips::EipsDataSource;
pub use data_source_tse_groups::TseGroupsDataSource;

use crate::api::signer::sha256_hex;

/// Stable id for a data source result derived from the ids it returned
pub(crate) fn ids_hash(ids: &[String]) -> String {
    let digest = sha256_hex(ids.join(",").as_bytes());
    digest[..16].to_string()
}
