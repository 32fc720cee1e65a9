#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Domain {
    Com,
    Cn,
}

/// Which `created_at` to stamp onto a downloaded file whose own metadata
/// carries no usable creation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TimestampFallback {
    /// The newest photo in the inventory, for every file. This is what the
    /// tool has always done, so it remains the default.
    #[default]
    #[value(name = "first-item")]
    FirstItem,
    /// The photo's own remote creation date.
    #[value(name = "item")]
    Item,
}
