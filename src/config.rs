//! Application-level configuration constants.

// Display precisions (decimal digits)
pub const VELOCITY_PRECISION: u32 = 4;
pub const ENERGY_PRECISION: u32 = 3;
pub const LINESTRENGTH_PRECISION: u32 = 4;
pub const FIT_PRECISION: u32 = 4;
pub const CHANNEL_PRECISION: u32 = 0;
pub const PEAKRMS_PRECISION: u32 = 1;
pub const BLEND_PRECISION: u32 = 0;

/// Columns that are not editable and start out hidden in the table editor.
pub const HIDDEN_COLUMNS: [&str; 8] = [
    "El",
    "Eu",
    "linestrength",
    "peakintensity",
    "peakoffset",
    "fwhm",
    "peakrms",
    "force",
];

/// Synthetic leading header entries of the interactive editor.
pub const DISPOSITION_COLUMNS: [&str; 3] = ["accept", "force", "reject"];

// Radio button group names are GROUP_PREFIX followed by the row ordinal.
pub const GROUP_PREFIX: &str = "buttonGroup";

// DOM wiring
pub const DATA_ELEMENT_ID: &str = "lineid-data";
pub const MOUNT_ELEMENT_ID: &str = "lineid-editor";
pub const TASK_FORM_PREFIX: &str = "admitform-";
pub const BDP_FORM_ID: &str = "admitform";
pub const WRITE_BDP_BUTTON_ID: &str = "writebdpbutton";

// Submission command names understood by the processing service
pub const FORCE_REJECT_COMMAND: &str = "forcereject";
pub const LINELIST_BDP_COMMAND: &str = "linelistbdp";
