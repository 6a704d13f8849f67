use std::time::Duration;

/// Default Kie.ai endpoint used when `KIE_BASE_URL` is not set
pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.kie.ai";

/// Model identifier sent with every generation job
pub const PROVIDER_MODEL: &str = "nano-banana-pro";

/// A4-like portrait ratio used for newspaper posters
pub const NEWSPAPER_ASPECT_RATIO: &str = "3:4";

/// Default aspect ratio for anything that is not a newspaper poster
pub const DEFAULT_ASPECT_RATIO: &str = "1:1";

pub const DEFAULT_RESOLUTION: &str = "2K";

pub const OUTPUT_FORMAT: &str = "png";

/// Delay between two job status queries
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Number of status queries before a job is declared timed out
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 60;

/// Timeout applied to callback deliveries
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_STORE_PATH: &str = ".runtime/tasks.json";

/// Version written into the persisted task document
pub const STORE_FORMAT_VERSION: u32 = 1;

pub const DEFAULT_PORT: u16 = 3000;

/// Estimated processing time reported while running in mock mode, in seconds
pub const MOCK_ESTIMATED_TIME_SECS: u64 = 5;

/// Placeholder image returned by mock generation
pub const MOCK_IMAGE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="768" height="1024"><rect width="100%" height="100%" fill="#f7f7ff"/><text x="50%" y="45%" dominant-baseline="middle" text-anchor="middle" font-family="Arial" font-size="28" fill="#333">MOCK IMAGE</text><text x="50%" y="52%" dominant-baseline="middle" text-anchor="middle" font-family="Arial" font-size="18" fill="#666">Set KIE_API_KEY for real generation</text></svg>"##;

/// Built-in prompt template for a children's literacy newspaper poster.
///
/// Placeholders: `{{theme}}`, `{{title}}`, `{{core_words}}`, `{{item_words}}`,
/// `{{environment_words}}`.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Create a vertical A4 children's literacy newspaper (识字小报) poster, bright cartoon style, clean white background.

Theme / scene: {{theme}}
Title at the top, in large playful Chinese characters: 《{{title}}》

Draw one cheerful scene of \"{{theme}}\" that fills the page. Every object listed below must appear in the picture, and each one carries a small rounded label showing its pinyin above its Chinese characters, placed right next to the object:

Core words (large, in the foreground): {{core_words}}
Everyday items (medium, spread around the scene): {{item_words}}
Environment (background details): {{environment_words}}

Requirements:
- Friendly, colorful, kid-safe illustration with thick outlines.
- Labels must be legible, correctly spelled, pinyin with tone marks.
- No extra text besides the title and the labels.";
