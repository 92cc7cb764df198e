pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const STATS: &str = "📊";
    pub const LINK: &str = "🔗";
    pub const FILE: &str = "📄";
    pub const TABLE: &str = "🗂️";
    pub const COLUMN: &str = "🔹";
    pub const DATABASE: &str = "🗄️";
    pub const INBOX: &str = "📥";
    pub const DIRECT: &str = "🔴";
    pub const INDIRECT: &str = "🟠";
    pub const GEAR: &str = "⚙️";
    pub const SHIELD: &str = "🛡️";
}
