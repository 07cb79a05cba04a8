//! Google Maps レビュー スクレイパー実装

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::auth::Credentials;
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{ProxyCredentials, ReviewSelectors, ScraperConfig};
use crate::error::ScraperError;
use crate::traits::{ScrollSurface, Scraper};

use super::extract::extract_records;
use super::network::{InFlightRequests, NetworkEvent};
use super::scroll::{scroll_until_stable, ScrollSettings};
use super::types::{ReviewRecord, ReviewSnapshot};

/// ネットワークアイドル待機のタイムアウト（ミリ秒）
const NETWORK_IDLE_TIMEOUT_MS: u64 = 30000;
/// ネットワークアイドル判定のインターバル（ミリ秒）
const NETWORK_IDLE_CHECK_INTERVAL_MS: u64 = 500;
/// セレクタ出現のポーリング間隔（ミリ秒）
const SELECTOR_POLL_INTERVAL_MS: u64 = 250;

/// Google Maps レビュー スクレイパー
pub struct MapsReviewScraper {
    config: ScraperConfig,
    browser: Option<Browser>,
    page: Option<Page>,
    tasks: Vec<JoinHandle<()>>,
}

impl MapsReviewScraper {
    /// 新しいスクレイパーを作成
    pub fn new(config: ScraperConfig) -> Self {
        Self {
            config,
            browser: None,
            page: None,
            tasks: Vec::new(),
        }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    fn get_page(&self) -> Result<&Page, ScraperError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScraperError::BrowserInit("Browser not initialized".into()))
    }

    fn browser_config(&self) -> Result<BrowserConfig, ScraperError> {
        let viewport = self.config.viewport;
        let mut builder = BrowserConfig::builder()
            .window_size(viewport.width, viewport.height)
            .no_sandbox()
            .request_timeout(self.config.navigation_timeout)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--lang=en-US");

        if !self.config.headless {
            builder = builder.with_head();
        }

        if let Some(path) = &self.config.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        if let Some(proxy) = &self.config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy.host));
        }

        if self.config.debug {
            builder = builder.arg("--enable-logging=stderr").arg("--v=1");
        }

        builder
            .build()
            .map_err(|e| ScraperError::BrowserInit(format!("Browser config error: {}", e)))
    }

    /// ページのビューポートを固定
    async fn apply_viewport(&self, page: &Page) -> Result<(), ScraperError> {
        let viewport = self.config.viewport;
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(viewport.width as i64)
            .height(viewport.height as i64)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(|e| ScraperError::BrowserInit(format!("Viewport error: {}", e)))?;

        page.execute(params)
            .await
            .map_err(|e| ScraperError::BrowserInit(format!("Viewport error: {}", e)))?;
        Ok(())
    }

    /// プロキシ認証を設定
    ///
    /// 認証要求への応答と一時停止リクエストの再開は chromiumoxide の
    /// ネットワークマネージャに任せる。
    async fn authenticate_proxy(
        &self,
        page: &Page,
        proxy: &ProxyCredentials,
    ) -> Result<(), ScraperError> {
        info!("Enabling proxy authentication for {}", proxy.host);

        page.authenticate(browser_credentials(proxy))
            .await
            .map_err(|e| ScraperError::Proxy(e.to_string()))?;

        Ok(())
    }

    /// ネットワークイベントの監視を開始
    async fn watch_network(&mut self, page: &Page) -> Result<InFlightRequests, ScraperError> {
        let started = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?
            .map(|e| NetworkEvent::Started(e.request_id.inner().clone()));
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?
            .map(|e| NetworkEvent::Finished(e.request_id.inner().clone()));
        let failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?
            .map(|e| NetworkEvent::Finished(e.request_id.inner().clone()));

        let requests = InFlightRequests::new();
        let tracker = requests.clone();
        let mut events = futures::stream::select(started, futures::stream::select(finished, failed));
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                tracker.apply(event);
            }
        }));

        Ok(requests)
    }

    /// 実行中リクエストが少ない状態が続くまで待機
    async fn wait_request_idle(
        &self,
        requests: &InFlightRequests,
        budget: Duration,
    ) -> Result<(), ScraperError> {
        info!("Waiting for network to become idle...");
        let start = Instant::now();
        let timeout = budget.min(Duration::from_millis(NETWORK_IDLE_TIMEOUT_MS));

        let mut idle_count = 0;
        const REQUIRED_IDLE_CHECKS: u32 = 3; // 連続3回アイドルでOK

        while start.elapsed() < timeout {
            if requests.is_idle() {
                idle_count += 1;
                if idle_count >= REQUIRED_IDLE_CHECKS {
                    info!("Network idle after {:?}", start.elapsed());
                    return Ok(());
                }
            } else {
                debug!("{} requests in flight", requests.count());
                idle_count = 0;
            }

            sleep(Duration::from_millis(NETWORK_IDLE_CHECK_INTERVAL_MS)).await;
        }

        warn!(
            "Network idle timeout after {:?}, proceeding anyway ({} requests in flight)",
            start.elapsed(),
            requests.count()
        );
        Ok(())
    }

    /// レビュー要素が1件以上描画されるまで待機
    async fn wait_for_reviews(&self, page: &Page) -> Result<(), ScraperError> {
        info!("Waiting for reviews to load...");
        let timeout = self.config.review_wait_timeout;
        let script = selector_exists_script(&self.config.selectors.item);
        let start = Instant::now();

        loop {
            let found = page
                .evaluate(script.as_str())
                .await
                .map(|v| v.into_value::<bool>().unwrap_or(false));

            match found {
                Ok(true) => {
                    debug!("First review rendered after {:?}", start.elapsed());
                    return Ok(());
                }
                Ok(false) => {}
                Err(e) => debug!("Review selector check error: {}", e),
            }

            if start.elapsed() >= timeout {
                break;
            }
            sleep(Duration::from_millis(SELECTOR_POLL_INTERVAL_MS)).await;
        }

        if self.config.debug {
            self.log_screenshot(page).await;
        }

        Err(ScraperError::NoReviews(format!(
            "no '{}' element within {:?}",
            self.config.selectors.item, timeout
        )))
    }

    /// デバッグ用スクリーンショットをログ出力
    async fn log_screenshot(&self, page: &Page) {
        match page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
        {
            Ok(screenshot) => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&screenshot);
                debug!("Page screenshot: data:image/png;base64,{}", encoded);
            }
            Err(e) => debug!("Failed to capture screenshot: {}", e),
        }
    }

    /// 描画済みレビュー要素を読み取る
    async fn snapshot_reviews(&self, page: &Page) -> Result<Vec<ReviewSnapshot>, ScraperError> {
        let json_str: String =
            evaluate_value(page, &snapshot_script(&self.config.selectors)).await?;
        serde_json::from_str(&json_str).map_err(|e| ScraperError::Json(e.to_string()))
    }
}

#[async_trait]
impl Scraper for MapsReviewScraper {
    async fn initialize(&mut self) -> Result<(), ScraperError> {
        info!("Initializing browser for review scraper...");

        let browser_config = self.browser_config()?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ハンドラータスクを起動
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {:?}", e);
                }
            }
        }));

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        self.browser = Some(browser);

        if let Some(proxy) = &self.config.proxy {
            self.authenticate_proxy(&page, proxy).await?;
        }

        self.apply_viewport(&page).await?;
        self.page = Some(page);

        info!("Browser initialized successfully");
        Ok(())
    }

    async fn navigate(&mut self) -> Result<(), ScraperError> {
        let page = self.get_page()?.clone();
        let requests = self.watch_network(&page).await?;

        let url = &self.config.target_url;
        let timeout = self.config.navigation_timeout;
        info!("Navigating to {}", url);
        let start = Instant::now();

        match tokio::time::timeout(timeout, page.goto(url.as_str())).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(ScraperError::Navigation(e.to_string())),
            Err(_) => {
                return Err(ScraperError::Timeout(format!(
                    "navigation did not finish within {:?}",
                    timeout
                )))
            }
        }

        // goto と合わせてナビゲーションタイムアウト内に収める
        let remaining = timeout.saturating_sub(start.elapsed());
        self.wait_request_idle(&requests, remaining).await
    }

    async fn collect(&mut self) -> Result<Vec<ReviewRecord>, ScraperError> {
        let page = self.get_page()?;

        self.wait_for_reviews(page).await?;

        info!("Starting to scroll for reviews...");
        let surface = PageSurface::new(page, &self.config.selectors);
        let settings = ScrollSettings {
            settle_interval: self.config.settle_interval,
            max_stale_rounds: self.config.max_stale_rounds,
        };
        let total = scroll_until_stable(&surface, settings).await?;
        info!("Finished scrolling. Found {} reviews.", total);

        let snapshots = self.snapshot_reviews(page).await?;
        let records = extract_records(&snapshots);
        info!("Successfully extracted {} reviews", records.len());

        Ok(records)
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        info!("Closing browser...");

        self.page = None;

        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                debug!("Browser close command failed: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("Failed to wait for browser process: {}", e);
            }
        }

        for task in self.tasks.drain(..) {
            task.abort();
        }

        info!("Browser closed");
        Ok(())
    }
}

/// [`ScrollSurface`] の chromiumoxide 実装
pub struct PageSurface<'a> {
    page: &'a Page,
    selectors: &'a ReviewSelectors,
}

impl<'a> PageSurface<'a> {
    pub fn new(page: &'a Page, selectors: &'a ReviewSelectors) -> Self {
        Self { page, selectors }
    }
}

#[async_trait]
impl ScrollSurface for PageSurface<'_> {
    async fn locate_container(&self) -> Result<bool, ScraperError> {
        evaluate_value(self.page, &locate_container_script(self.selectors)).await
    }

    async fn scroll_to_end(&self) -> Result<(), ScraperError> {
        let scrolled: bool = evaluate_value(self.page, SCROLL_TO_END_SCRIPT).await?;
        if !scrolled {
            debug!("Scroll container detached from page");
        }
        Ok(())
    }

    async fn item_count(&self) -> Result<usize, ScraperError> {
        evaluate_value(self.page, &count_script(&self.selectors.item)).await
    }
}

async fn evaluate_value<T: DeserializeOwned>(page: &Page, script: &str) -> Result<T, ScraperError> {
    page.evaluate(script)
        .await
        .map_err(|e| ScraperError::JavaScript(e.to_string()))?
        .into_value::<T>()
        .map_err(|e| ScraperError::Json(e.to_string()))
}

// ========================================
// ページ内スクリプト
// ========================================

const SCROLL_TO_END_SCRIPT: &str = r#"
    (() => {
        const el = window.__reviewScroller;
        if (!el || !el.isConnected) return false;
        if (el.scrollTo) {
            el.scrollTo(0, el.scrollHeight);
        } else {
            el.scrollTop = el.scrollHeight;
        }
        return true;
    })()
"#;

fn browser_credentials(proxy: &ProxyCredentials) -> Credentials {
    Credentials {
        username: proxy.username.clone(),
        password: proxy.password.clone(),
    }
}

/// JS 文字列リテラルとして埋め込む
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn selector_exists_script(selector: &str) -> String {
    format!("document.querySelector({}) !== null", js_string(selector))
}

fn count_script(selector: &str) -> String {
    format!("document.querySelectorAll({}).length", js_string(selector))
}

/// スクロールコンテナを探して `window.__reviewScroller` に保持する
fn locate_container_script(selectors: &ReviewSelectors) -> String {
    let candidates = serde_json::Value::from(selectors.scroll_containers.clone()).to_string();
    format!(
        r#"
        (() => {{
            const candidates = {candidates};
            const item = {item};
            let found = null;
            for (const selector of candidates) {{
                const el = document.querySelector(selector);
                if (el) {{
                    found = el;
                    break;
                }}
            }}
            if (!found) {{
                for (const div of document.querySelectorAll('div')) {{
                    if (div.scrollHeight > div.clientHeight && div.querySelector(item)) {{
                        found = div;
                        break;
                    }}
                }}
            }}
            window.__reviewScroller = found;
            return found !== null;
        }})()
    "#,
        candidates = candidates,
        item = js_string(&selectors.item),
    )
}

/// 各レビュー要素のフィールドを JSON 文字列で返す
fn snapshot_script(selectors: &ReviewSelectors) -> String {
    format!(
        r#"
        (() => {{
            const cards = document.querySelectorAll({item});
            const data = [];
            cards.forEach((card) => {{
                const textOf = (selector) => {{
                    const el = card.querySelector(selector);
                    return el ? el.innerText : null;
                }};
                const rating = card.querySelector({rating});
                data.push({{
                    name: textOf({name}),
                    text: textOf({text}),
                    date: textOf({date}),
                    ratingLabel: rating ? rating.getAttribute('aria-label') : null,
                }});
            }});
            return JSON.stringify(data);
        }})()
    "#,
        item = js_string(&selectors.item),
        rating = js_string(&selectors.star_rating),
        name = js_string(&selectors.reviewer_name),
        text = js_string(&selectors.review_text),
        date = js_string(&selectors.review_date),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Viewport;

    #[test]
    fn test_scraper_new() {
        let config = ScraperConfig::new("https://maps.example/place");
        let scraper = MapsReviewScraper::new(config);
        assert!(scraper.browser.is_none());
        assert!(scraper.page.is_none());
        assert_eq!(scraper.config().viewport, Viewport::default());
    }

    #[test]
    fn test_get_page_before_initialize() {
        let scraper = MapsReviewScraper::new(ScraperConfig::default());
        assert!(matches!(
            scraper.get_page(),
            Err(ScraperError::BrowserInit(_))
        ));
    }

    #[test]
    fn test_scripts_quote_selectors() {
        let selectors = ReviewSelectors::default();

        assert_eq!(
            count_script(&selectors.item),
            r#"document.querySelectorAll(".jftiEf.fontBodyMedium").length"#
        );

        let locate = locate_container_script(&selectors);
        assert!(locate.contains(r#"".DxyBCb [role=\"main\"]""#));
        assert!(locate.contains(r#"".section-layout-root""#));

        let snapshot = snapshot_script(&selectors);
        for selector in [".d4r55", ".wiI7pd", ".rsqaWe", ".kvMYJc"] {
            assert!(snapshot.contains(&format!("\"{}\"", selector)));
        }
    }

    #[test]
    fn test_browser_credentials() {
        let proxy = ProxyCredentials::new("brd-user", "s3cret", "brd.superproxy.io:22225");
        let creds = browser_credentials(&proxy);
        assert_eq!(creds.username, "brd-user");
        assert_eq!(creds.password, "s3cret");
    }

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string(r#"a "b" 'c'"#), r#""a \"b\" 'c'""#);
    }

    #[tokio::test]
    async fn test_navigate_without_browser() {
        let mut scraper = MapsReviewScraper::new(ScraperConfig::default());
        assert!(scraper.navigate().await.is_err());
        assert!(scraper.close().await.is_ok());
    }

    #[tokio::test]
    #[ignore] // 実環境テスト用: MAPS_URL=... cargo test test_live_scrape -- --ignored --nocapture
    async fn test_live_scrape() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("info,maps_review_scraper=debug")
            .try_init();

        let config = ScraperConfig::from_env().expect("MAPS_URL not set");
        let mut scraper = MapsReviewScraper::new(config);

        match scraper.execute().await {
            Ok(records) => {
                println!("Extracted {} reviews", records.len());
                for r in records.iter().take(3) {
                    println!("  - {:?}", r);
                }
            }
            Err(e) if e.is_no_reviews() => println!("No reviews: {}", e),
            Err(e) => panic!("Scrape failed: {:?}", e),
        }
    }
}
