//! Feature names
//!
//! Column names exactly as they appear in the training schema
//! (`model_info.json` -> `feature_columns`). Renaming any of these breaks
//! compatibility with every artifact set trained so far.

// === Calendar ===
pub const MONTH: &str = "Bulan";
pub const DAY: &str = "Hari";
pub const WEEKDAY: &str = "Hari_Minggu";
pub const QUARTER: &str = "Quarter";
pub const IS_WEEKEND: &str = "Is_Weekend";
pub const IS_MONTH_END: &str = "Is_Akhir_Bulan";
pub const IS_MONTH_START: &str = "Is_Awal_Bulan";
pub const DAYS_FROM_MONTH_START: &str = "Hari_Dari_Awal_Bulan";

// === Amount ===
// Older schemas call the amount column "Nominal"; both are emitted and the
// projection keeps whichever the schema lists.
pub const AMOUNT: &str = "Nominal_Transaksi";
pub const AMOUNT_LEGACY: &str = "Nominal";

/// Behavioral features filled from training-set means.
/// At inference time only the date and amount are known, so per-payer
/// history is replaced by the population average.
pub const BEHAVIORAL: &[&str] = &[
    // Frequency / volume
    "Total_Transaksi",
    "Rata_Nominal",
    "Frekuensi_Per_Hari",
    "Durasi_Aktif_Hari",
    "Rata_Interval_Hari",
    // Lateness history
    "Jumlah_Terlambat",
    "Persentase_Terlambat",
    // Channel flags
    "Is_TopUp",
    "Is_QRIS",
    "Is_Transfer",
    // Channel proportions
    "Prop_TopUp",
    "Prop_QRIS",
    "Prop_Transfer",
    // Recent activity
    "Aktivitas_Bulan_Ini",
    "Aktivitas_Quarter_Ini",
];
