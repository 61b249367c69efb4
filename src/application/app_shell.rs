// App shell - session gate, navigation, shared date range and preferences
use crate::application::analytics_api::AnalyticsApi;
use crate::application::auth_service::{AuthError, AuthService, LoginOutcome, NavItem};
use crate::application::chart_registry::ChartRegistry;
use crate::application::key_value_store::{KeyValueStore, KEY_SIDEBAR_COLLAPSED, KEY_THEME};
use crate::application::notifications::{NotificationCenter, ToastKind};
use crate::application::section::{FilterError, LoadContext, SectionController, SectionDeps, SectionFilter};
use crate::application::sections::customer::CustomerSection;
use crate::application::sections::dashboard::DashboardSection;
use crate::application::sections::inventory::InventorySection;
use crate::application::sections::ml::MlSection;
use crate::application::sections::reviews::ReviewsSection;
use crate::application::sections::settings::{
    report_query, ChartPreferences, ReportFormat, ReportKind, SettingsSection, REPORT_EXPORT_PATH,
};
use crate::domain::analytics::StockItem;
use crate::domain::components::post_button;
use crate::domain::date_range::{DateRange, DateRangeError};
use crate::domain::page::Page;
use crate::domain::session::Session;
use crate::domain::theme::{ResolvedTheme, ThemePreference};
use crate::domain::view::{el, View};
use chrono::Local;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("Debe iniciar sesión")]
    NotAuthenticated,
    #[error("No tiene permiso para acceder a esta sección")]
    Forbidden(Page),
}

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Filter(#[from] FilterError),
}

#[derive(Debug, Clone)]
pub struct ShellOptions {
    pub offline_demo: bool,
    pub toast_duration: Duration,
    pub search_debounce: Duration,
    pub default_range_days: u64,
}

/// Rendered shell plus the document-level flags the layout needs
#[derive(Debug, Clone, PartialEq)]
pub struct ShellView {
    pub title: &'static str,
    pub dark: bool,
    pub sidebar_collapsed: bool,
    pub body: View,
}

#[derive(Debug)]
struct ShellState {
    current_page: Page,
    date_range: DateRange,
    theme: ThemePreference,
    system_prefers_dark: bool,
    sidebar_collapsed: bool,
}

pub struct AppShell {
    api: Arc<dyn AnalyticsApi>,
    auth: AuthService,
    store: Arc<dyn KeyValueStore>,
    charts: ChartRegistry,
    notifications: NotificationCenter,
    dashboard: DashboardSection,
    customer: CustomerSection,
    reviews: ReviewsSection,
    ml: MlSection,
    inventory: InventorySection,
    settings: SettingsSection,
    state: RwLock<ShellState>,
}

impl AppShell {
    pub fn new(api: Arc<dyn AnalyticsApi>, store: Arc<dyn KeyValueStore>, options: ShellOptions) -> Self {
        let charts = ChartRegistry::new(ResolvedTheme::Light, true);
        let notifications = NotificationCenter::new(options.toast_duration);
        let deps = SectionDeps {
            api: api.clone(),
            charts: charts.clone(),
            notifications: notifications.clone(),
        };
        let today = Local::now().date_naive();

        Self {
            api: api.clone(),
            auth: AuthService::new(api, store.clone(), options.offline_demo),
            store: store.clone(),
            charts,
            notifications,
            dashboard: DashboardSection::new(deps.clone()),
            customer: CustomerSection::new(deps.clone()),
            reviews: ReviewsSection::new(deps.clone()),
            ml: MlSection::new(deps.clone()),
            inventory: InventorySection::new(deps.clone(), options.search_debounce),
            settings: SettingsSection::new(deps, store),
            state: RwLock::new(ShellState {
                current_page: Page::Dashboard,
                date_range: DateRange::last_days(today, options.default_range_days),
                theme: ThemePreference::default(),
                system_prefers_dark: false,
                sidebar_collapsed: false,
            }),
        }
    }

    fn section(&self, page: Page) -> &dyn SectionController {
        match page {
            Page::Dashboard => &self.dashboard,
            Page::Customer => &self.customer,
            Page::Reviews => &self.reviews,
            Page::Ml => &self.ml,
            Page::Inventory => &self.inventory,
            Page::Settings => &self.settings,
        }
    }

    async fn context(&self) -> LoadContext {
        LoadContext {
            range: self.state.read().await.date_range,
        }
    }

    /// Restores persisted preferences and session; an authenticated user
    /// lands on the current page with its data loaded
    pub async fn bootstrap(&self) {
        self.apply_theme_preference().await;
        let collapsed = self.store.get(KEY_SIDEBAR_COLLAPSED).await.as_deref() == Some("true");
        self.state.write().await.sidebar_collapsed = collapsed;
        self.settings.load_preferences().await;

        if self.auth.check_session().await.is_some() {
            self.show_current().await;
        }
    }

    async fn show_current(&self) {
        let page = self.state.read().await.current_page;
        let ctx = self.context().await;
        self.section(page).show_page(&ctx).await;
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        match self.auth.login(username, password).await {
            Ok(outcome) => {
                self.notifications.notify(ToastKind::Success, outcome.welcome()).await;
                self.state.write().await.current_page = Page::Dashboard;
                self.show_current().await;
                Ok(outcome)
            }
            Err(e) => {
                let kind = match e {
                    AuthError::MissingFields => ToastKind::Warning,
                    _ => ToastKind::Error,
                };
                self.notifications.notify(kind, e.to_string()).await;
                Err(e)
            }
        }
    }

    pub async fn logout(&self) {
        self.auth.logout().await;
        self.state.write().await.current_page = Page::Dashboard;
        self.notifications.notify(ToastKind::Info, "Sesión cerrada").await;
    }

    pub async fn current_user(&self) -> Option<Session> {
        self.auth.current_user().await
    }

    #[cfg(test)]
    pub async fn current_page(&self) -> Page {
        self.state.read().await.current_page
    }

    pub async fn date_range(&self) -> DateRange {
        self.state.read().await.date_range
    }

    /// Fails unless the user is signed in and holds the page's permission
    pub async fn authorize(&self, page: Page) -> Result<(), NavigationError> {
        if !self.auth.is_authenticated().await {
            return Err(NavigationError::NotAuthenticated);
        }
        if !self.auth.has_permission(&page.permission()).await {
            tracing::warn!("Navigation to {} denied", page);
            return Err(NavigationError::Forbidden(page));
        }
        Ok(())
    }

    /// Switches the active page and loads it. Returns false when `page` is
    /// already active.
    pub async fn navigate_to_page(&self, page: Page) -> Result<bool, NavigationError> {
        self.authorize(page).await?;
        {
            let mut state = self.state.write().await;
            if state.current_page == page {
                return Ok(false);
            }
            state.current_page = page;
        }
        tracing::info!("Navigating to {}", page);
        self.show_current().await;
        Ok(true)
    }

    /// Validates and applies a new date range, then reloads the current
    /// page. Invalid input changes nothing.
    pub async fn apply_date_filter(&self, start: Option<&str>, end: Option<&str>) -> Result<DateRange, DateRangeError> {
        let range = DateRange::parse(start, end)?;
        self.state.write().await.date_range = range;
        tracing::info!("Date range set to {} .. {}", range.start_param(), range.end_param());
        self.show_current().await;
        Ok(range)
    }

    /// Routes a submitted `field=value` to the section of `page`
    pub async fn apply_filter(&self, page: Page, field: &str, value: &str) -> Result<(), ShellError> {
        self.authorize(page).await?;
        let filter = SectionFilter::parse(page, field, value)?;
        let ctx = self.context().await;
        self.section(page).apply_filter(filter, &ctx).await?;
        Ok(())
    }

    async fn resolved_theme(&self) -> ResolvedTheme {
        let state = self.state.read().await;
        state.theme.resolve(state.system_prefers_dark)
    }

    async fn apply_theme(&self) -> ResolvedTheme {
        let resolved = self.resolved_theme().await;
        let refreshed = self.charts.refresh_all(resolved).await;
        tracing::debug!("Applied {} theme to {} charts", resolved.mode(), refreshed);
        resolved
    }

    /// Applies the persisted theme; unknown values are discarded
    pub async fn apply_theme_preference(&self) -> ResolvedTheme {
        let theme = match self.store.get(KEY_THEME).await {
            Some(raw) => match raw.parse::<ThemePreference>() {
                Ok(theme) => theme,
                Err(e) => {
                    tracing::warn!("Discarding persisted theme: {}", e);
                    if let Err(e) = self.store.remove(KEY_THEME).await {
                        tracing::error!("Failed to clear persisted theme: {}", e);
                    }
                    ThemePreference::default()
                }
            },
            None => ThemePreference::default(),
        };
        self.state.write().await.theme = theme;
        self.apply_theme().await
    }

    pub async fn set_theme(&self, theme: ThemePreference) -> ResolvedTheme {
        self.state.write().await.theme = theme;
        if let Err(e) = self.store.set(KEY_THEME, theme.as_str()).await {
            tracing::error!("Failed to persist theme: {}", e);
        }
        self.apply_theme().await
    }

    /// Flips between light and dark based on what is currently shown
    pub async fn toggle_dark_mode(&self) -> ResolvedTheme {
        let next = if self.resolved_theme().await.is_dark() {
            ThemePreference::Light
        } else {
            ThemePreference::Dark
        };
        self.set_theme(next).await
    }

    /// Records the client's color-scheme preference used by `auto`
    pub async fn set_system_preference(&self, prefers_dark: bool) {
        let theme = {
            let mut state = self.state.write().await;
            if state.system_prefers_dark == prefers_dark {
                return;
            }
            state.system_prefers_dark = prefers_dark;
            state.theme
        };
        if theme == ThemePreference::Auto {
            self.apply_theme().await;
        }
    }

    pub async fn toggle_sidebar(&self) -> bool {
        let collapsed = {
            let mut state = self.state.write().await;
            state.sidebar_collapsed = !state.sidebar_collapsed;
            state.sidebar_collapsed
        };
        let value = if collapsed { "true" } else { "false" };
        if let Err(e) = self.store.set(KEY_SIDEBAR_COLLAPSED, value).await {
            tracing::error!("Failed to persist sidebar state: {}", e);
        }
        collapsed
    }

    pub async fn save_chart_preferences(&self, preferences: ChartPreferences) -> Result<(), NavigationError> {
        self.authorize(Page::Settings).await?;
        self.settings.save_preferences(preferences).await;
        self.notifications
            .notify(ToastKind::Success, "Configuración guardada correctamente")
            .await;
        Ok(())
    }

    pub async fn report_url(&self, kind: ReportKind, format: ReportFormat) -> Result<String, NavigationError> {
        if !self.auth.is_authenticated().await {
            return Err(NavigationError::NotAuthenticated);
        }
        let range = self.date_range().await;
        Ok(self.api.url_for(REPORT_EXPORT_PATH, &report_query(kind, format, &range)))
    }

    pub async fn restock(&self, product_id: &str) -> Result<JoinHandle<()>, NavigationError> {
        self.authorize(Page::Inventory).await?;
        Ok(self.inventory.restock(product_id).await)
    }

    pub async fn inventory_items(&self) -> Result<Vec<StockItem>, NavigationError> {
        self.authorize(Page::Inventory).await?;
        Ok(self.inventory.stock_items().await)
    }

    pub async fn close_notification(&self, id: u64) -> bool {
        self.notifications.close(id).await
    }

    pub async fn chart_options(&self, container: &str) -> Option<Value> {
        self.charts.get(container).await.map(|handle| handle.options)
    }

    pub async fn render(&self) -> ShellView {
        let (page, range, sidebar_collapsed) = {
            let state = self.state.read().await;
            (state.current_page, state.date_range, state.sidebar_collapsed)
        };
        let dark = self.resolved_theme().await.is_dark();
        let toasts = self.notifications.render().await;

        let Some(user) = self.auth.current_user().await else {
            return ShellView {
                title: "Iniciar Sesión",
                dark,
                sidebar_collapsed,
                body: el("div").child(login_gate()).child(toasts).into(),
            };
        };

        let nav = self.auth.nav_items().await;
        let content = el("div")
            .id(page.container_id())
            .class("page-container active")
            .child(self.section(page).render().await);

        let header = el("header")
            .class("top-bar")
            .child(post_button("/sidebar/toggle", "☰", "btn btn-link sidebar-toggle"))
            .child(el("h1").id("page-title").text(page.title()))
            .child(date_filter(&range))
            .child(post_button(
                "/theme/toggle",
                if dark { "Modo claro" } else { "Modo oscuro" },
                "btn btn-sm btn-outline-secondary",
            ))
            .child(el("span").id("user-name").class("user-name").text(user.name))
            .child(post_button("/logout", "Cerrar Sesión", "btn btn-sm btn-outline-danger"));

        ShellView {
            title: page.title(),
            dark,
            sidebar_collapsed,
            body: el("div")
                .class(if sidebar_collapsed { "wrapper sidebar-collapsed" } else { "wrapper" })
                .child(sidebar(&nav, page))
                .child(el("main").class("main-content").child(header).child(content))
                .child(toasts)
                .into(),
        }
    }
}

fn login_gate() -> View {
    el("div")
        .id("login-container")
        .class("login-container")
        .child(
            el("form")
                .attr("method", "post")
                .attr("action", "/login")
                .class("login-form")
                .child(el("h2").text("Iniciar Sesión"))
                .child(
                    el("input")
                        .attr("type", "text")
                        .attr("name", "username")
                        .id("username")
                        .class("form-control")
                        .attr("placeholder", "Usuario"),
                )
                .child(
                    el("input")
                        .attr("type", "password")
                        .attr("name", "password")
                        .id("password")
                        .class("form-control")
                        .attr("placeholder", "Contraseña"),
                )
                .child(
                    el("button")
                        .attr("type", "submit")
                        .class("btn btn-primary w-100")
                        .text("Iniciar Sesión"),
                ),
        )
        .into()
}

fn sidebar(items: &[NavItem], active: Page) -> View {
    let entries = items.iter().map(|item| {
        let page = item.page;
        let mut class = "nav-link".to_string();
        if page == active {
            class.push_str(" active");
        }
        if !item.enabled {
            class.push_str(" disabled");
        }
        let mut link = el("a")
            .class(class)
            .attr("data-page", page.slug())
            .child(el("i").class(page.icon()))
            .child(el("span").class("nav-label").text(page.nav_label()));
        link = match item.tooltip {
            Some(tooltip) => link.attr("title", tooltip).attr("aria-disabled", "true"),
            None => link.attr("href", format!("/pages/{}", page.slug())),
        };
        el("li").class("nav-item").child(link)
    });
    el("nav")
        .id("sidebar")
        .class("sidebar")
        .child(el("ul").class("nav flex-column").children(entries))
        .into()
}

fn date_filter(range: &DateRange) -> View {
    el("form")
        .attr("method", "post")
        .attr("action", "/filters/date")
        .class("date-filter d-flex gap-2")
        .child(
            el("input")
                .attr("type", "date")
                .attr("name", "start_date")
                .id("start-date")
                .attr("value", range.start_param()),
        )
        .child(
            el("input")
                .attr("type", "date")
                .attr("name", "end_date")
                .id("end-date")
                .attr("value", range.end_param()),
        )
        .child(
            el("button")
                .attr("type", "submit")
                .class("btn btn-sm btn-primary")
                .id("apply-date-filter")
                .text("Aplicar"),
        )
        .into()
}
