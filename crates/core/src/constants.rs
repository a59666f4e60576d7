//! Constants used throughout the trendy core crate.
//!
//! Bucket boundaries here are only defaults; [`crate::config::TrendConfig`] can
//! override them at startup.

/// Separator between the components of an encoded trend selector.
pub const SELECTOR_SEPARATOR: &str = trendy_types::IDENTIFIER_SEPARATOR;

/// Drill-down value that stands for "no coded value".
pub const NULL_SENTINEL: &str = "None";

/// Date format used in admission bucket labels and drill-down values.
pub const LINK_DATE_FORMAT: &str = "%d/%m/%Y";

/// Suffix marking the open-ended last bucket of a bar chart.
pub const OPEN_BUCKET_SUFFIX: &str = "+";

/// First cell of a bar chart's x-axis row.
pub const X_AXIS_SERIES: &str = "x";

/// Series name of the admissions bar chart.
pub const ADMISSIONS_SERIES: &str = "Admissions";

/// Series name of the age bar chart.
pub const AGE_SERIES: &str = "Age";

/// Column suffix holding the coded (lookup list) half of a coded-or-free-text field.
pub const FK_SUFFIX: &str = "_fk";

/// Column suffix holding the free-text half of a coded-or-free-text field.
pub const FT_SUFFIX: &str = "_ft";

/// Relationship prefix for subrecords that hang off an episode's patient.
pub const PATIENT_RELATION: &str = "patient";

/// Episode column holding the admission date.
pub const EPISODE_START_COLUMN: &str = "start";

/// Demographics field used by the age chart when no field is given.
pub const DATE_OF_BIRTH_FIELD: &str = "date_of_birth";

/// Default admission quarter boundaries as `(year, month, day)`; the last one is open-ended.
pub const DEFAULT_ADMISSION_BOUNDARIES: &[(i32, u32, u32)] = &[
    (2016, 7, 1),
    (2016, 10, 1),
    (2017, 1, 1),
    (2017, 4, 1),
    (2017, 7, 1),
];

/// Default age band boundaries in years; the last one is open-ended.
pub const DEFAULT_AGE_BOUNDARIES: &[u32] = &[0, 20, 40, 60, 80];

/// Number of decimal places a gauge fraction is rounded to before scaling.
pub const PERCENTAGE_FRACTION_DECIMALS: usize = 3;
