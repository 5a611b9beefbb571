//! Dashboard wiring sources to widgets.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use polars::prelude::DataFrame;
use tracing::debug;

use folio_core::{
    AnalyticsSource, DataError, FinancialsSource, PriceSource, RepositorySource, Result,
    SeasonalEffect, SettingsHandle, SiteStats, Symbol, TimeWindow, ValuationDocument,
    ValuationModel, ValuationSource, bars,
};
use folio_metrics::{BandSelection, EnrichPolicy, EnrichedSeries, LanguageShare, MetricsBuilder};

use crate::widget::Widget;

/// Owner whose repositories feed the language chart when none is configured.
const DEFAULT_GITHUB_USER: &str = "kungsiuchun";

/// The dashboard's widgets and the sources behind them.
///
/// Every selection goes through the matching [`Widget`], so a newer
/// selection cancels the previous request and only the latest result is
/// published.
///
/// # Example
///
/// ```rust,ignore
/// use folio::{Dashboard, FeedClient, GithubClient, TimeWindow, ValuationModel};
///
/// let dashboard = Dashboard::new(settings)
///     .with_feeds(FeedClient::new())
///     .with_github(GithubClient::new());
///
/// dashboard.select_valuation(&"NVDA".into()).await?;
/// let overlay = dashboard.bands(TimeWindow::TwoYears, ValuationModel::Pe);
/// ```
pub struct Dashboard {
    financials_source: Option<Arc<dyn FinancialsSource>>,
    valuation_source: Option<Arc<dyn ValuationSource>>,
    price_source: Option<Arc<dyn PriceSource>>,
    repository_source: Option<Arc<dyn RepositorySource>>,
    analytics_source: Option<Arc<dyn AnalyticsSource>>,
    settings: SettingsHandle,
    builder: MetricsBuilder,
    github_user: String,
    report: Widget<EnrichedSeries>,
    valuation: Widget<ValuationDocument>,
    prices: Widget<DataFrame>,
    languages: Widget<Vec<LanguageShare>>,
    site_stats: Widget<SiteStats>,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field(
                "financials_source",
                &self.financials_source.as_ref().map(|p| p.name()),
            )
            .field(
                "valuation_source",
                &self.valuation_source.as_ref().map(|p| p.name()),
            )
            .field("price_source", &self.price_source.as_ref().map(|p| p.name()))
            .field(
                "repository_source",
                &self.repository_source.as_ref().map(|p| p.name()),
            )
            .field(
                "analytics_source",
                &self.analytics_source.as_ref().map(|p| p.name()),
            )
            .field("policy", &self.builder.policy())
            .field("github_user", &self.github_user)
            .field("report", &self.report)
            .field("valuation", &self.valuation)
            .field("prices", &self.prices)
            .field("languages", &self.languages)
            .field("site_stats", &self.site_stats)
            .finish_non_exhaustive()
    }
}

fn not_configured(what: &str) -> DataError {
    DataError::ProviderNotConfigured(format!("No {what} source registered"))
}

impl Dashboard {
    /// Create a dashboard without sources.
    #[must_use]
    pub fn new(settings: SettingsHandle) -> Self {
        Self {
            financials_source: None,
            valuation_source: None,
            price_source: None,
            repository_source: None,
            analytics_source: None,
            settings,
            builder: MetricsBuilder::new(),
            github_user: DEFAULT_GITHUB_USER.to_string(),
            report: Widget::new("financial-report"),
            valuation: Widget::new("valuation-chart"),
            prices: Widget::new("stock-dashboard"),
            languages: Widget::new("github-stats"),
            site_stats: Widget::new("site-analytics"),
        }
    }

    /// Register the financials source.
    #[must_use]
    pub fn with_financials(mut self, source: Arc<dyn FinancialsSource>) -> Self {
        debug!(provider = source.name(), "Registering financials source");
        self.financials_source = Some(source);
        self
    }

    /// Register the valuation source.
    #[must_use]
    pub fn with_valuation(mut self, source: Arc<dyn ValuationSource>) -> Self {
        debug!(provider = source.name(), "Registering valuation source");
        self.valuation_source = Some(source);
        self
    }

    /// Register the daily bars source.
    #[must_use]
    pub fn with_prices(mut self, source: Arc<dyn PriceSource>) -> Self {
        debug!(provider = source.name(), "Registering price source");
        self.price_source = Some(source);
        self
    }

    /// Register the repository source and the owner to list.
    #[must_use]
    pub fn with_repositories(
        mut self,
        source: Arc<dyn RepositorySource>,
        owner: impl Into<String>,
    ) -> Self {
        debug!(provider = source.name(), "Registering repository source");
        self.repository_source = Some(source);
        self.github_user = owner.into();
        self
    }

    /// Register the page-view statistics source.
    #[must_use]
    pub fn with_analytics(mut self, source: Arc<dyn AnalyticsSource>) -> Self {
        debug!(provider = source.name(), "Registering analytics source");
        self.analytics_source = Some(source);
        self
    }

    /// Use `policy` for records with non-finite metrics.
    #[must_use]
    pub fn with_policy(mut self, policy: EnrichPolicy) -> Self {
        self.builder = MetricsBuilder::with_policy(policy);
        self
    }

    /// Register the feed client for financials, valuation, prices and stats.
    #[cfg(feature = "feeds")]
    #[must_use]
    pub fn with_feeds(self, client: folio_feeds::FeedClient) -> Self {
        let client = Arc::new(client);
        self.with_financials(client.clone())
            .with_valuation(client.clone())
            .with_prices(client.clone())
            .with_analytics(client)
    }

    /// Register the GitHub client for the language chart.
    #[cfg(feature = "github")]
    #[must_use]
    pub fn with_github(self, client: folio_github::GithubClient) -> Self {
        let owner = client.user().to_string();
        self.with_repositories(Arc::new(client), owner)
    }

    /// Build a dashboard from `FOLIO_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Other`] if an HTTP client cannot be built.
    #[cfg(all(feature = "feeds", feature = "github"))]
    pub fn from_env(settings: SettingsHandle) -> Result<Self> {
        let feeds = folio_feeds::FeedClient::with_config(folio_feeds::FeedConfig::from_env())?;
        let github =
            folio_github::GithubClient::with_config(folio_github::GithubConfig::from_env())?;
        Ok(Self::new(settings).with_feeds(feeds).with_github(github))
    }

    /// Shared settings handle.
    #[must_use]
    pub const fn settings(&self) -> &SettingsHandle {
        &self.settings
    }

    /// Financial report widget.
    #[must_use]
    pub const fn report(&self) -> &Widget<EnrichedSeries> {
        &self.report
    }

    /// Valuation chart widget.
    #[must_use]
    pub const fn valuation(&self) -> &Widget<ValuationDocument> {
        &self.valuation
    }

    /// Price basket widget.
    #[must_use]
    pub const fn prices(&self) -> &Widget<DataFrame> {
        &self.prices
    }

    /// Language statistics widget.
    #[must_use]
    pub const fn languages(&self) -> &Widget<Vec<LanguageShare>> {
        &self.languages
    }

    /// Site analytics widget.
    #[must_use]
    pub const fn site_stats(&self) -> &Widget<SiteStats> {
        &self.site_stats
    }

    /// Loads and enriches the financial records of `symbol`.
    ///
    /// # Errors
    ///
    /// Fetch and enrichment errors are published on the report widget and
    /// returned; [`DataError::Cancelled`] means a newer selection won.
    pub async fn select_financials(&self, symbol: &Symbol) -> Result<Arc<EnrichedSeries>> {
        let source = self
            .financials_source
            .clone()
            .ok_or_else(|| not_configured("financials"))?;
        let builder = self.builder;

        self.report
            .load(symbol.as_str(), |cancel| async move {
                let records = source.fetch_financials(symbol, &cancel).await?;
                builder.build(records)
            })
            .await
    }

    /// Loads the valuation document of `symbol`.
    ///
    /// # Errors
    ///
    /// See [`select_financials`](Self::select_financials).
    pub async fn select_valuation(&self, symbol: &Symbol) -> Result<Arc<ValuationDocument>> {
        let source = self
            .valuation_source
            .clone()
            .ok_or_else(|| not_configured("valuation"))?;

        self.valuation
            .load(symbol.as_str(), |cancel| async move {
                source.fetch_valuation(symbol, &cancel).await
            })
            .await
    }

    /// Band overlay of the loaded valuation document.
    ///
    /// Switching window or model never refetches; returns `None` until a
    /// document is ready.
    #[must_use]
    pub fn bands(&self, window: TimeWindow, model: ValuationModel) -> Option<BandSelection> {
        self.valuation
            .state()
            .data()
            .map(|doc| folio_metrics::select_bands(doc, window, model))
    }

    /// Loads the daily bars of the whole basket.
    ///
    /// # Errors
    ///
    /// See [`select_financials`](Self::select_financials).
    pub async fn load_prices(&self) -> Result<Arc<DataFrame>> {
        let source = self
            .price_source
            .clone()
            .ok_or_else(|| not_configured("price"))?;

        self.prices
            .load("basket", |cancel| async move {
                source.fetch_daily_bars(&cancel).await
            })
            .await
    }

    /// Tickers of the loaded basket in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ParseFailed`] if the frame lacks a symbol column.
    pub fn price_tickers(&self) -> Result<Vec<Symbol>> {
        match self.prices.state().data() {
            Some(frame) => bars::tickers(frame),
            None => Ok(Vec::new()),
        }
    }

    /// Chronological bars of `symbol` from the loaded basket.
    ///
    /// Returns `Ok(None)` until the basket is ready.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ParseFailed`] if the frame cannot be filtered.
    pub fn price_series(&self, symbol: &Symbol) -> Result<Option<DataFrame>> {
        self.prices
            .state()
            .data()
            .map(|frame| bars::ticker_series(frame, symbol))
            .transpose()
    }

    /// Loads repository metadata and counts primary languages.
    ///
    /// # Errors
    ///
    /// See [`select_financials`](Self::select_financials).
    pub async fn load_languages(&self) -> Result<Arc<Vec<LanguageShare>>> {
        let source = self
            .repository_source
            .clone()
            .ok_or_else(|| not_configured("repository"))?;
        let owner = self.github_user.as_str();

        self.languages
            .load(owner, |cancel| async move {
                let repos = source.fetch_repositories(owner, &cancel).await?;
                Ok(folio_metrics::language_shares(&repos))
            })
            .await
    }

    /// Loads the page-view statistics.
    ///
    /// # Errors
    ///
    /// See [`select_financials`](Self::select_financials).
    pub async fn load_site_stats(&self) -> Result<Arc<SiteStats>> {
        let source = self
            .analytics_source
            .clone()
            .ok_or_else(|| not_configured("analytics"))?;

        self.site_stats
            .load("stats", |cancel| async move {
                source.fetch_site_stats(&cancel).await
            })
            .await
    }

    /// Seasonal overlay for today's date in the local time zone.
    #[must_use]
    pub fn seasonal_effect(&self) -> Option<SeasonalEffect> {
        Self::seasonal_effect_at(&Local::now())
    }

    /// Seasonal overlay for the calendar date of `now` in its own time zone.
    #[must_use]
    pub fn seasonal_effect_at<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<SeasonalEffect> {
        Self::seasonal_effect_on(now.date_naive())
    }

    /// Seasonal overlay for `date`.
    #[must_use]
    pub fn seasonal_effect_on(date: NaiveDate) -> Option<SeasonalEffect> {
        SeasonalEffect::for_date(date)
    }

    /// Cancels every request in flight, as when the page goes away.
    pub async fn unmount(&self) {
        self.report.unmount().await;
        self.valuation.unmount().await;
        self.prices.unmount().await;
        self.languages.unmount().await;
        self.site_stats.unmount().await;
    }
}
