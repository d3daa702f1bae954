//! Sample package shared by the unit tests.

use crate::data::package::Package;

pub const MAIN: &str = "Emain";
pub const CREATOR: &str = "Ecreator";
pub const ORG: &str = "Eorg";

pub const PACKAGE_JSON: &str = include_str!("../../tests/data/package.json");

pub fn package() -> Package {
    PACKAGE_JSON.parse().unwrap()
}
