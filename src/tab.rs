//! The five logical sections of the site-editing form.

use std::fmt;
use std::str::FromStr;

/// Field id of the project-number display on every tab except basic.
pub const PROJECT_NO_FIELD: &str = "project_no";

/// Basic-tab fields that together form the project number.
pub const PROJECT_NO_PREFIX_FIELD: &str = "project_no_prefix";
pub const PROJECT_NO_NUMBER_FIELD: &str = "project_no_number";

const BASIC_FIELDS: &[&str] = &[
    PROJECT_NO_PREFIX_FIELD,
    PROJECT_NO_NUMBER_FIELD,
    "construction_company",
    "site_name",
    "address",
    "detail_address",
    "household_count",
    "registration_date",
    "delivery_date",
    "completion_date",
    "certification_audit",
    "home_iot",
    "product_bi",
];

const CONTACTS_FIELDS: &[&str] = &[
    PROJECT_NO_FIELD,
    "pm_name",
    "pm_phone",
    "sales_manager_name",
    "sales_manager_phone",
    "construction_manager_name",
    "construction_manager_phone",
    "installer_name",
    "installer_phone",
    "network_manager_name",
    "network_manager_phone",
];

const PRODUCTS_FIELDS: &[&str] = &[
    PROJECT_NO_FIELD,
    "wallpad_model",
    "wallpad_qty",
    "doorphone_model",
    "doorphone_qty",
    "lobbyphone_model",
    "lobbyphone_qty",
    "guardphone_model",
    "guardphone_qty",
    "magnet_sensor_model",
    "magnet_sensor_qty",
    "motion_sensor_model",
    "motion_sensor_qty",
    "opener_model",
    "opener_qty",
];

const HOUSEHOLD_FIELDS: &[&str] = &[
    PROJECT_NO_FIELD,
    "lighting_enabled",
    "lighting_company",
    "standby_enabled",
    "standby_company",
    "gas_enabled",
    "gas_company",
];

const COMMON_FIELDS: &[&str] = &[
    PROJECT_NO_FIELD,
    "parking_enabled",
    "parking_company",
    "metering_enabled",
    "metering_company",
    "cctv_enabled",
    "cctv_company",
];

/// A domain tab of the site form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tab {
    Basic,
    Contacts,
    Products,
    Household,
    Common,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Basic,
        Tab::Contacts,
        Tab::Products,
        Tab::Household,
        Tab::Common,
    ];

    /// Order in which the final save persists the tabs after the site record.
    pub const PERSIST_ORDER: [Tab; 4] = [Tab::Contacts, Tab::Products, Tab::Household, Tab::Common];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Basic => "basic",
            Tab::Contacts => "contacts",
            Tab::Products => "products",
            Tab::Household => "household",
            Tab::Common => "common",
        }
    }

    /// Name shown to the user in dialogs.
    pub fn display_name(&self) -> &'static str {
        match self {
            Tab::Basic => "기본정보",
            Tab::Contacts => "연락처",
            Tab::Products => "제품수량",
            Tab::Household => "세대부연동",
            Tab::Common => "공용부연동",
        }
    }

    /// Every field id bound on this tab, including the project-number display.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Tab::Basic => BASIC_FIELDS,
            Tab::Contacts => CONTACTS_FIELDS,
            Tab::Products => PRODUCTS_FIELDS,
            Tab::Household => HOUSEHOLD_FIELDS,
            Tab::Common => COMMON_FIELDS,
        }
    }

    /// Fields whose values are captured into drafts.
    ///
    /// The project-number display on non-basic tabs mirrors the basic tab and
    /// is never drafted on its own.
    pub fn draft_fields(&self) -> impl Iterator<Item = &'static str> {
        let skip_display = *self != Tab::Basic;
        self.fields()
            .iter()
            .copied()
            .filter(move |f| !(skip_display && *f == PROJECT_NO_FIELD))
    }

    /// Whether this tab carries a project-number display field.
    pub fn has_project_no_display(&self) -> bool {
        *self != Tab::Basic
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown tab: {0}")]
pub struct UnknownTab(pub String);

impl FromStr for Tab {
    type Err = UnknownTab;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Tab::Basic),
            "contacts" => Ok(Tab::Contacts),
            "products" => Ok(Tab::Products),
            "household" => Ok(Tab::Household),
            "common" => Ok(Tab::Common),
            other => Err(UnknownTab(other.to_string())),
        }
    }
}
