use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ScraperError;

/// プロキシ認証情報
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
    /// `host:port` 形式 (Chrome の `--proxy-server` にそのまま渡す)
    pub host: String,
}

impl ProxyCredentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            host: host.into(),
        }
    }
}

// パスワードはログに出さない
impl fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("host", &self.host)
            .finish()
    }
}

/// ページのビューポートサイズ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// レビュー一覧ページのセレクタ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSelectors {
    /// レビュー1件分の要素
    pub item: String,
    pub reviewer_name: String,
    pub review_text: String,
    pub review_date: String,
    /// `aria-label` に "N stars" を持つ要素
    pub star_rating: String,
    /// スクロールコンテナ候補（先頭から順に試す）
    pub scroll_containers: Vec<String>,
}

impl Default for ReviewSelectors {
    fn default() -> Self {
        Self {
            item: ".jftiEf.fontBodyMedium".to_string(),
            reviewer_name: ".d4r55".to_string(),
            review_text: ".wiI7pd".to_string(),
            review_date: ".rsqaWe".to_string(),
            star_rating: ".kvMYJc".to_string(),
            scroll_containers: vec![
                r#".DxyBCb [role="main"]"#.to_string(),
                r#".WNBkOb [role="main"]"#.to_string(),
                ".review-dialog-list".to_string(),
                ".section-layout-root".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub target_url: String,
    pub proxy: Option<ProxyCredentials>,
    pub headless: bool,
    pub viewport: Viewport,
    /// `goto` 全体のタイムアウト
    pub navigation_timeout: Duration,
    /// 最初のレビュー要素の出現待ち
    pub review_wait_timeout: Duration,
    /// スクロール後の描画待ち
    pub settle_interval: Duration,
    /// 件数が連続で変化しなかった回数の上限
    pub max_stale_rounds: u32,
    pub output_dir: PathBuf,
    pub chrome_executable: Option<PathBuf>,
    pub debug: bool,
    pub selectors: ReviewSelectors,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            proxy: None,
            headless: true,
            viewport: Viewport::default(),
            navigation_timeout: Duration::from_secs(60),
            review_wait_timeout: Duration::from_secs(10),
            settle_interval: Duration::from_secs(2),
            max_stale_rounds: 10,
            output_dir: PathBuf::from("."),
            chrome_executable: None,
            debug: false,
            selectors: ReviewSelectors::default(),
        }
    }
}

impl ScraperConfig {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            ..Default::default()
        }
    }

    /// 環境変数から設定を構築
    ///
    /// - `MAPS_URL` (必須)
    /// - `PROXY_USERNAME` / `PROXY_PASSWORD` / `PROXY_HOST` (3つ揃った場合のみ有効)
    /// - `HEADLESS` (`false` で表示モード)
    /// - `OUTPUT_DIR`
    /// - `CHROME_PATH` / `CHROMIUM_PATH`
    /// - `SCRAPER_DEBUG`
    pub fn from_env() -> Result<Self, ScraperError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ScraperError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let target_url = lookup("MAPS_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ScraperError::Config("MAPS_URL is not set".into()))?;

        let mut config = Self::new(target_url);

        let proxy_parts = (
            lookup("PROXY_USERNAME"),
            lookup("PROXY_PASSWORD"),
            lookup("PROXY_HOST"),
        );
        config.proxy = match proxy_parts {
            (Some(user), Some(pass), Some(host)) => Some(ProxyCredentials::new(user, pass, host)),
            (None, None, None) => None,
            _ => {
                return Err(ScraperError::Config(
                    "PROXY_USERNAME, PROXY_PASSWORD and PROXY_HOST must be set together".into(),
                ))
            }
        };

        if let Some(headless) = lookup("HEADLESS") {
            config.headless = parse_flag(&headless);
        }
        if let Some(dir) = lookup("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        config.chrome_executable = lookup("CHROME_PATH")
            .or_else(|| lookup("CHROMIUM_PATH"))
            .map(PathBuf::from);
        if let Some(debug) = lookup("SCRAPER_DEBUG") {
            config.debug = parse_flag(&debug);
        }

        Ok(config)
    }

    pub fn with_proxy(mut self, proxy: ProxyCredentials) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = Viewport { width, height };
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_review_wait_timeout(mut self, timeout: Duration) -> Self {
        self.review_wait_timeout = timeout;
        self
    }

    pub fn with_settle_interval(mut self, interval: Duration) -> Self {
        self.settle_interval = interval;
        self
    }

    pub fn with_max_stale_rounds(mut self, rounds: u32) -> Self {
        self.max_stale_rounds = rounds;
        self
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn with_chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_executable = Some(path.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_selectors(mut self, selectors: ReviewSelectors) -> Self {
        self.selectors = selectors;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ScraperConfig::default();
        assert!(config.headless);
        assert_eq!(config.viewport, Viewport { width: 1920, height: 1080 });
        assert_eq!(config.navigation_timeout, Duration::from_secs(60));
        assert_eq!(config.review_wait_timeout, Duration::from_secs(10));
        assert_eq!(config.settle_interval, Duration::from_secs(2));
        assert_eq!(config.max_stale_rounds, 10);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.selectors.scroll_containers.len(), 4);
    }

    #[test]
    fn test_config_builder() {
        let config = ScraperConfig::new("https://maps.example/place")
            .with_headless(false)
            .with_viewport(1280, 800)
            .with_output_dir("/tmp/reviews")
            .with_settle_interval(Duration::from_millis(500))
            .with_max_stale_rounds(3)
            .with_proxy(ProxyCredentials::new("user", "secret", "proxy.local:22225"));

        assert_eq!(config.target_url, "https://maps.example/place");
        assert!(!config.headless);
        assert_eq!(config.viewport.width, 1280);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/reviews"));
        assert_eq!(config.settle_interval, Duration::from_millis(500));
        assert_eq!(config.max_stale_rounds, 3);
        assert_eq!(config.proxy.as_ref().map(|p| p.host.as_str()), Some("proxy.local:22225"));
    }

    #[test]
    fn test_proxy_debug_hides_password() {
        let proxy = ProxyCredentials::new("user", "secret", "proxy.local:22225");
        let printed = format!("{:?}", proxy);
        assert!(printed.contains("user"));
        assert!(!printed.contains("secret"));
    }

    #[test]
    fn test_from_lookup_full() {
        let config = ScraperConfig::from_lookup(lookup_from(&[
            ("MAPS_URL", "https://maps.example/place"),
            ("PROXY_USERNAME", "u"),
            ("PROXY_PASSWORD", "p"),
            ("PROXY_HOST", "h:1"),
            ("HEADLESS", "false"),
            ("OUTPUT_DIR", "out"),
            ("CHROMIUM_PATH", "/usr/bin/chromium"),
            ("SCRAPER_DEBUG", "1"),
        ]))
        .unwrap();

        assert_eq!(config.target_url, "https://maps.example/place");
        assert_eq!(config.proxy, Some(ProxyCredentials::new("u", "p", "h:1")));
        assert!(!config.headless);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.chrome_executable, Some(PathBuf::from("/usr/bin/chromium")));
        assert!(config.debug);
    }

    #[test]
    fn test_from_lookup_requires_url() {
        let err = ScraperConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ScraperError::Config(_)));
    }

    #[test]
    fn test_from_lookup_rejects_partial_proxy() {
        let err = ScraperConfig::from_lookup(lookup_from(&[
            ("MAPS_URL", "https://maps.example/place"),
            ("PROXY_USERNAME", "u"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ScraperError::Config(_)));
    }
}
