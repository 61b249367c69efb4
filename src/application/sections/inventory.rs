// Inventory section - stock levels, alerts, suppliers, discounts and the searchable stock list
use crate::application::analytics_api::{AnalyticsApi, ApiError};
use crate::application::chart_registry::RenderPolicy;
use crate::application::debounce::Debouncer;
use crate::application::notifications::{NotificationCenter, ToastKind};
use crate::application::section::{
    unsupported, FilterError, LoadContext, RequestGenerations, SectionController, SectionCore, SectionDeps,
    SectionFilter, Ticket,
};
use crate::domain::analytics::{DiscountImpact, NamedOption, StockAlert, StockCategory, StockItem, SupplierPerformance};
use crate::domain::chart::{Axis, BarChart, ChartSpec, ComboChart, Palette, RadarChart, Series};
use crate::domain::components::{card, col, message_row, post_button, row, select_form, table};
use crate::domain::format::{format_fixed, format_locale, format_trimmed};
use crate::domain::page::Page;
use crate::domain::view::{el, Element, View};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub const STOCK_LEVELS_CHART: &str = "stock-levels-chart";
pub const SUPPLIER_CHART: &str = "supplier-performance-chart";
pub const DISCOUNT_CHART: &str = "discount-impact-chart";

const SUMMARY: &str = "summary";
const STOCK_LEVELS: &str = "stock-levels";
const ALERTS: &str = "alerts";
const SUPPLIER: &str = "supplier";
const DISCOUNT: &str = "discount";

pub const PAGE_SIZE: usize = 10;
const LOW_STOCK: f64 = 10.0;
const EXCESS_STOCK: f64 = 50.0;
const RESTOCK_NOTICE: Duration = Duration::from_millis(5000);
const RESTOCK_CONFIRMATION: Duration = Duration::from_millis(3000);
const RESTOCK_DELAY: Duration = Duration::from_millis(1500);

const TABLE_COLUMNS: [&str; 9] = [
    "ID",
    "Producto",
    "Categoría",
    "Stock",
    "Precio",
    "Descuento",
    "Proveedor",
    "Estado",
    "Acciones",
];

pub const SUPPLIERS: [NamedOption; 4] = [
    NamedOption { id: "sup1", name: "Proveedor Electrónica X" },
    NamedOption { id: "sup2", name: "Textiles Y" },
    NamedOption { id: "sup3", name: "Distribuidora Z" },
    NamedOption { id: "sup4", name: "Importadora Global" },
];

pub const DISCOUNT_PRODUCTS: [NamedOption; 4] = [
    NamedOption { id: "prod1", name: "Smartphone X Pro" },
    NamedOption { id: "prod2", name: "Laptop Ultra" },
    NamedOption { id: "prod3", name: "Auriculares Premium" },
    NamedOption { id: "prod4", name: "Cámara DSLR" },
];

/// Units of one category split by stock band
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryStock {
    pub name: String,
    pub low: f64,
    pub optimal: f64,
    pub excess: f64,
}

/// Groups items by category in first-seen order
pub fn group_by_category(items: &[StockItem]) -> Vec<CategoryStock> {
    let mut groups: Vec<CategoryStock> = Vec::new();
    for item in items {
        let index = match groups.iter().position(|g| g.name == item.category) {
            Some(index) => index,
            None => {
                groups.push(CategoryStock {
                    name: item.category.clone(),
                    ..CategoryStock::default()
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[index];
        if item.stock_level < LOW_STOCK {
            group.low += item.stock_level;
        } else if item.stock_level < EXCESS_STOCK {
            group.optimal += item.stock_level;
        } else {
            group.excess += item.stock_level;
        }
    }
    groups
}

pub fn stock_levels_chart(groups: &[CategoryStock]) -> ChartSpec {
    let series = |name: &str, pick: fn(&CategoryStock) -> f64| Series::new(name, groups.iter().map(pick).collect());
    ChartSpec::Bar(BarChart {
        categories: groups.iter().map(|g| g.name.clone()).collect(),
        series: vec![
            series("Stock Bajo", |g| g.low),
            series("Stock Óptimo", |g| g.optimal),
            series("Stock Excesivo", |g| g.excess),
        ],
        stacked: true,
        colors: Palette::fixed(&["#FF4560", "#00E396", "#008FFB"]),
        y_axis: Axis::titled("Unidades"),
        ..BarChart::default()
    })
}

pub fn supplier_chart(data: &SupplierPerformance) -> ChartSpec {
    ChartSpec::Radar(RadarChart {
        categories: data.months.clone(),
        series: vec![
            Series::new("Tiempo de entrega", data.delivery_times.clone()),
            Series::new("Calidad del producto", data.quality_scores.clone()),
            Series::new("Completitud de pedidos", data.completeness.clone()),
        ],
        colors: Palette::fixed(&["#FF4560", "#00E396", "#FEB019"]),
        y_axis: Axis::range(0.0, 10.0),
    })
}

pub fn discount_chart(data: &DiscountImpact) -> ChartSpec {
    ChartSpec::Combo(ComboChart {
        categories: data.dates.clone(),
        column: Series::new("Ventas", data.sales.clone()),
        line: Series::new("Descuento", data.discounts.clone()),
        colors: Palette::fixed(&["#00E396", "#FF4560"]),
        column_title: "Ventas (unidades)".to_string(),
        line_title: "Descuento (%)".to_string(),
    })
}

/// Resolves an inventory request; failures raise an error toast and leave
/// the widget empty
async fn fetch_or_notify<T, Fut>(notifications: &NotificationCenter, widget: &str, request: Fut, message: &str) -> T
where
    T: Default,
    Fut: Future<Output = Result<T, ApiError>>,
{
    match request.await {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!("{} unavailable: {}", widget, e);
            notifications.notify(ToastKind::Error, message).await;
            T::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum AlertList {
    Loading,
    Loaded(Vec<StockAlert>),
    Failed,
}

async fn fetch_alerts(api: &dyn AnalyticsApi) -> AlertList {
    match api.inventory_alerts().await {
        Ok(alerts) => AlertList::Loaded(alerts),
        Err(e) => {
            tracing::warn!("Low stock alerts unavailable: {}", e);
            AlertList::Failed
        }
    }
}

fn alert_item(alert: &StockAlert) -> Element {
    let id = alert.product_id_text();
    let level = if alert.is_critical() { "critical" } else { "warning" };
    el("li")
        .class("alert-item")
        .child(
            el("div")
                .class(format!("alert-icon {}", level))
                .child(el("i").class("fas fa-exclamation-triangle")),
        )
        .child(
            el("div")
                .class("alert-content")
                .child(el("p").class("alert-title").text(alert.product_name.clone()))
                .child(
                    el("p")
                        .class("alert-description")
                        .text("Stock: ")
                        .child(el("strong").text(format_trimmed(alert.stock_level, 2)))
                        .text(" unidades"),
                )
                .child(el("p").class("alert-category").text(alert.category.clone())),
        )
        .child(el("div").class("alert-action").child(post_button(
            &format!("/inventory/restock/{}", urlencoding::encode(&id)),
            "Reponer",
            "btn btn-sm btn-primary",
        )))
}

fn stock_row(item: &StockItem) -> Element {
    let low = item.is_below_threshold();
    let fill = if item.threshold > 0.0 {
        (item.stock_level / item.threshold * 100.0).min(100.0)
    } else {
        100.0
    };
    let id = item.product_id_text();
    el("tr")
        .child(el("td").text(id.clone()))
        .child(el("td").text(item.product_name.clone()))
        .child(el("td").text(item.category.clone()))
        .child(
            el("td")
                .child(
                    el("div").class("stock-bar").child(el("div").class("stock-progress").attr(
                        "style",
                        format!(
                            "width: {}%; background-color: {}",
                            format_trimmed(fill, 1),
                            if low { "#e74a3b" } else { "#1cc88a" }
                        ),
                    )),
                )
                .child(el("span").text(format!(
                    "{} / {}",
                    format_trimmed(item.stock_level, 2),
                    format_trimmed(item.threshold, 2)
                ))),
        )
        .child(el("td").text(format!("${}", format_fixed(item.price, 2))))
        .child(el("td").text(format!("{}%", format_trimmed(item.discount, 2))))
        .child(el("td").text(item.supplier_name.clone()))
        .child(
            el("td").child(
                el("span")
                    .class(format!("status-badge {}", if low { "low" } else { "ok" }))
                    .text(if low { "Stock Bajo" } else { "OK" }),
            ),
        )
        .child(el("td").child(post_button(
            &format!("/inventory/restock/{}", urlencoding::encode(&id)),
            "Reponer",
            "btn btn-sm btn-success",
        )))
}

/// One page of the (optionally searched) stock list
#[derive(Debug, Clone, PartialEq)]
pub struct StockPage {
    pub items: Vec<StockItem>,
    pub page: usize,
    pub total_pages: usize,
    pub matched: usize,
}

pub fn paginate(items: &[StockItem], search: &str, page: usize) -> StockPage {
    let term = search.trim();
    let matching: Vec<&StockItem> = items.iter().filter(|item| term.is_empty() || item.matches(term)).collect();
    let total_pages = matching.len().div_ceil(PAGE_SIZE).max(1);
    let page = page.clamp(1, total_pages);
    StockPage {
        items: matching
            .iter()
            .skip((page - 1) * PAGE_SIZE)
            .take(PAGE_SIZE)
            .map(|item| (*item).clone())
            .collect(),
        page,
        total_pages,
        matched: matching.len(),
    }
}

fn pagination(page: &StockPage) -> Element {
    let link = |label: String, target: usize, class: String| {
        el("li").class(class).child(
            el("button")
                .attr("type", "submit")
                .attr("name", "page")
                .attr("value", target.to_string())
                .class("page-link")
                .text(label),
        )
    };
    let previous = link(
        "Anterior".to_string(),
        page.page.saturating_sub(1).max(1),
        format!("page-item{}", if page.page == 1 { " disabled" } else { "" }),
    );
    let next = link(
        "Siguiente".to_string(),
        (page.page + 1).min(page.total_pages),
        format!("page-item{}", if page.page == page.total_pages { " disabled" } else { "" }),
    );
    let numbers = (1..=page.total_pages).map(|i| {
        link(
            i.to_string(),
            i,
            format!("page-item{}", if i == page.page { " active" } else { "" }),
        )
    });
    el("form")
        .attr("method", "post")
        .attr("action", "/pages/inventory/filter")
        .child(
            el("ul")
                .class("pagination justify-content-center")
                .id("inventory-pagination")
                .child(previous)
                .children(numbers)
                .child(next),
        )
}

enum Update {
    Summary(Ticket, Vec<StockItem>),
    /// Unfiltered stock feeding both the summary and the category chart
    FullStock {
        summary: Ticket,
        levels: Ticket,
        items: Vec<StockItem>,
    },
    StockLevels(Ticket, Vec<StockItem>),
    Alerts(Ticket, AlertList),
    Supplier(Ticket, SupplierPerformance),
    Discount(Ticket, DiscountImpact),
}

struct InventoryState {
    generations: RequestGenerations,
    category: Option<StockCategory>,
    supplier: String,
    product: String,
    items: Option<Vec<StockItem>>,
    alerts: AlertList,
    search: String,
    page: usize,
}

impl Default for InventoryState {
    fn default() -> Self {
        Self {
            generations: RequestGenerations::default(),
            category: None,
            supplier: SUPPLIERS[0].id.to_string(),
            product: DISCOUNT_PRODUCTS[0].id.to_string(),
            items: None,
            alerts: AlertList::Loading,
            search: String::new(),
            page: 1,
        }
    }
}

pub struct InventorySection {
    core: SectionCore,
    state: Arc<Mutex<InventoryState>>,
    search: Debouncer,
}

impl InventorySection {
    pub fn new(deps: SectionDeps, search_debounce: Duration) -> Self {
        Self {
            core: SectionCore::new(deps),
            state: Arc::new(Mutex::new(InventoryState::default())),
            search: Debouncer::new(search_debounce),
        }
    }

    fn stock_levels_request(&self, ticket: Ticket, category: Option<StockCategory>) -> BoxFuture<'_, Update> {
        let deps = &self.core.deps;
        Box::pin(async move {
            let items = fetch_or_notify(
                &deps.notifications,
                "stock levels",
                deps.api.inventory_stock(category),
                "Error al cargar niveles de stock",
            )
            .await;
            Update::StockLevels(ticket, items)
        })
    }

    fn supplier_request(&self, ticket: Ticket, supplier: String) -> BoxFuture<'_, Update> {
        let deps = &self.core.deps;
        Box::pin(async move {
            let data = fetch_or_notify(
                &deps.notifications,
                "supplier performance",
                deps.api.supplier_performance(&supplier),
                "Error al cargar datos de proveedor",
            )
            .await;
            Update::Supplier(ticket, data)
        })
    }

    fn discount_request(&self, ticket: Ticket, product: String) -> BoxFuture<'_, Update> {
        let deps = &self.core.deps;
        Box::pin(async move {
            let data = fetch_or_notify(
                &deps.notifications,
                "discount impact",
                deps.api.discount_impact(&product),
                "Error al cargar datos de descuentos",
            )
            .await;
            Update::Discount(ticket, data)
        })
    }

    async fn apply(&self, update: Update) {
        let charts = &self.core.deps.charts;
        let policy = RenderPolicy::Recreate;
        let mut state = self.state.lock().await;
        match update {
            Update::Summary(ticket, items) => {
                if state.generations.accept(&ticket) {
                    state.items = Some(items);
                }
            }
            Update::FullStock { summary, levels, items } => {
                if state.generations.accept(&levels) {
                    let groups = group_by_category(&items);
                    charts.render(STOCK_LEVELS_CHART, stock_levels_chart(&groups), policy).await;
                }
                if state.generations.accept(&summary) {
                    state.items = Some(items);
                }
            }
            Update::StockLevels(ticket, items) => {
                if state.generations.accept(&ticket) {
                    let groups = group_by_category(&items);
                    charts.render(STOCK_LEVELS_CHART, stock_levels_chart(&groups), policy).await;
                }
            }
            Update::Alerts(ticket, alerts) => {
                if state.generations.accept(&ticket) {
                    state.alerts = alerts;
                }
            }
            Update::Supplier(ticket, data) => {
                if state.generations.accept(&ticket) {
                    charts.render(SUPPLIER_CHART, supplier_chart(&data), policy).await;
                }
            }
            Update::Discount(ticket, data) => {
                if state.generations.accept(&ticket) {
                    charts.render(DISCOUNT_CHART, discount_chart(&data), policy).await;
                }
            }
        }
    }

    async fn drain(&self, mut pending: FuturesUnordered<BoxFuture<'_, Update>>) {
        while let Some(update) = pending.next().await {
            self.apply(update).await;
        }
    }

    /// Requests a restock of `product_id`: an info toast now, a confirmation
    /// and a fresh alert list once the request settles
    pub async fn restock(&self, product_id: &str) -> JoinHandle<()> {
        let notifications = self.core.deps.notifications.clone();
        notifications
            .notify_for(
                ToastKind::Info,
                format!("Solicitando reposición de stock para el producto {}", product_id),
                RESTOCK_NOTICE,
            )
            .await;
        tracing::info!("Restock requested for product {}", product_id);

        let api = self.core.deps.api.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(RESTOCK_DELAY).await;
            notifications
                .notify_for(
                    ToastKind::Success,
                    "Reposición de stock solicitada correctamente",
                    RESTOCK_CONFIRMATION,
                )
                .await;
            let ticket = state.lock().await.generations.issue(ALERTS);
            let alerts = fetch_alerts(api.as_ref()).await;
            let mut state = state.lock().await;
            if state.generations.accept(&ticket) {
                state.alerts = alerts;
            }
        })
    }

    /// Every item of the last full stock load
    pub async fn stock_items(&self) -> Vec<StockItem> {
        self.state.lock().await.items.clone().unwrap_or_default()
    }
}

#[async_trait]
impl SectionController for InventorySection {
    fn page(&self) -> Page {
        Page::Inventory
    }

    fn core(&self) -> &SectionCore {
        &self.core
    }

    async fn build(&self) {}

    async fn load_data(&self, _ctx: &LoadContext) {
        let (summary, levels, alerts, supplier, discount, category, supplier_id, product_id) = {
            let mut state = self.state.lock().await;
            (
                state.generations.issue(SUMMARY),
                state.generations.issue(STOCK_LEVELS),
                state.generations.issue(ALERTS),
                state.generations.issue(SUPPLIER),
                state.generations.issue(DISCOUNT),
                state.category,
                state.supplier.clone(),
                state.product.clone(),
            )
        };

        let deps = &self.core.deps;
        let pending: FuturesUnordered<BoxFuture<'_, Update>> = FuturesUnordered::new();
        pending.push(Box::pin(async move {
            let items = fetch_or_notify(
                &deps.notifications,
                "inventory summary",
                deps.api.inventory_stock(None),
                "Error al cargar datos de inventario",
            )
            .await;
            match category {
                None => Update::FullStock { summary, levels, items },
                Some(_) => Update::Summary(summary, items),
            }
        }));
        if category.is_some() {
            pending.push(self.stock_levels_request(levels, category));
        }
        pending.push(Box::pin(async move {
            Update::Alerts(alerts, fetch_alerts(deps.api.as_ref()).await)
        }));
        if !supplier_id.is_empty() {
            pending.push(self.supplier_request(supplier, supplier_id));
        }
        if !product_id.is_empty() {
            pending.push(self.discount_request(discount, product_id));
        }
        self.drain(pending).await;
    }

    async fn apply_filter(&self, filter: SectionFilter, _ctx: &LoadContext) -> Result<(), FilterError> {
        let mut state = self.state.lock().await;
        let request = match filter {
            SectionFilter::StockCategory(category) => {
                state.category = category;
                let ticket = state.generations.issue(STOCK_LEVELS);
                self.stock_levels_request(ticket, category)
            }
            SectionFilter::Supplier(supplier) => {
                state.supplier = supplier.clone();
                if supplier.is_empty() {
                    return Ok(());
                }
                let ticket = state.generations.issue(SUPPLIER);
                self.supplier_request(ticket, supplier)
            }
            SectionFilter::DiscountProduct(product) => {
                state.product = product.clone();
                if product.is_empty() {
                    return Ok(());
                }
                let ticket = state.generations.issue(DISCOUNT);
                self.discount_request(ticket, product)
            }
            SectionFilter::InventorySearch(term) => {
                let shared = self.state.clone();
                self.search
                    .call(async move {
                        let mut state = shared.lock().await;
                        state.search = term;
                        state.page = 1;
                    })
                    .await;
                return Ok(());
            }
            SectionFilter::InventoryPage(page) => {
                let total_pages = paginate(state.items.as_deref().unwrap_or_default(), &state.search, 1).total_pages;
                if (1..=total_pages).contains(&page) {
                    state.page = page;
                }
                return Ok(());
            }
            other => return Err(unsupported(self.page(), &other)),
        };
        drop(state);

        let pending = FuturesUnordered::new();
        pending.push(request);
        self.drain(pending).await;
        Ok(())
    }

    async fn render(&self) -> View {
        let charts = &self.core.deps.charts;
        let state = self.state.lock().await;

        let loaded = state.items.as_ref().filter(|items| !items.is_empty()).is_some();
        let figure = |value: &str| if loaded { value.to_string() } else { "0".to_string() };
        let trend = |value: &str| if loaded { value.to_string() } else { "0%".to_string() };
        let total_stock: f64 = state.items.iter().flatten().map(|item| item.stock_level).sum();

        let metric = |icon: &str, title: &str, id: &str, value: String, direction: &str, trend_id: &str, change: String| {
            let arrow = match direction {
                "up" => "arrow-up",
                "down" => "arrow-down",
                _ => "minus",
            };
            col(
                "col-lg-3 col-md-6",
                el("div").class("card metric-card").child(
                    el("div")
                        .class("card-body")
                        .child(el("div").class("metric-icon").child(el("i").class(format!("fas fa-{}", icon))))
                        .child(
                            el("div")
                                .class("metric-content")
                                .child(el("h5").class("metric-title").text(title))
                                .child(el("p").class("metric-value").id(id).text(value))
                                .child(
                                    el("p")
                                        .class(format!("metric-trend {}", direction))
                                        .child(el("i").class(format!("fas fa-{}", arrow)))
                                        .text(" ")
                                        .child(el("span").id(trend_id).text(change)),
                                ),
                        ),
                ),
            )
        };
        let metrics = row(vec![
            metric(
                "cubes",
                "Stock Total",
                "total-stock",
                format_locale(total_stock),
                "up",
                "stock-trend",
                trend("5.2%"),
            ),
            metric(
                "exclamation-triangle",
                "Alertas Stock Bajo",
                "low-stock-count",
                figure("12"),
                "down",
                "alert-trend",
                trend("8.3%"),
            ),
            metric(
                "shipping-fast",
                "Pedidos Pendientes",
                "pending-orders",
                figure("27"),
                "up",
                "orders-trend",
                trend("12.5%"),
            ),
            metric(
                "truck",
                "Proveedores Activos",
                "active-suppliers",
                figure("8"),
                "neutral",
                "suppliers-trend",
                "0%".to_string(),
            ),
        ]);

        let action = "/pages/inventory/filter";
        let category_options: Vec<(String, String)> = std::iter::once((String::new(), "Todas las categorías".to_string()))
            .chain(StockCategory::ALL.iter().map(|c| (c.as_str().to_string(), c.label().to_string())))
            .collect();
        let category_filter = select_form(
            action,
            "category",
            "stock-category-filter",
            &category_options,
            state.category.map(|c| c.as_str()).unwrap_or_default(),
        );
        let named = |placeholder: &str, options: &[NamedOption]| -> Vec<(String, String)> {
            std::iter::once((String::new(), placeholder.to_string()))
                .chain(options.iter().map(|o| (o.id.to_string(), o.name.to_string())))
                .collect()
        };
        let supplier_filter = select_form(
            action,
            "supplier",
            "supplier-filter",
            &named("Todos los proveedores", &SUPPLIERS[..]),
            &state.supplier,
        );
        let product_filter = select_form(
            action,
            "product",
            "product-discount-filter",
            &named("Seleccionar producto", &DISCOUNT_PRODUCTS[..]),
            &state.product,
        );

        let alert_list = el("ul").class("alert-list").id("low-stock-alerts");
        let alert_list = match &state.alerts {
            AlertList::Loading => alert_list.child(el("li").class("placeholder-item").text("Cargando alertas...")),
            AlertList::Failed => alert_list.child(el("li").class("error-item").text("Error al cargar alertas")),
            AlertList::Loaded(alerts) if alerts.is_empty() => {
                alert_list.child(el("li").class("no-alerts").text("No hay alertas de stock bajo"))
            }
            AlertList::Loaded(alerts) => alert_list.children(alerts.iter().map(alert_item)),
        };

        let items = state.items.as_deref().unwrap_or_default();
        let listing = paginate(items, &state.search, state.page);
        let search_term = state.search.trim();
        let (rows, pager) = if items.is_empty() {
            (vec![message_row(TABLE_COLUMNS.len(), "No hay productos en el inventario")], View::empty())
        } else if listing.matched == 0 {
            let message = format!("No se encontraron productos que coincidan con \"{}\"", search_term);
            (vec![message_row(TABLE_COLUMNS.len(), &message)], View::empty())
        } else {
            (listing.items.iter().map(stock_row).collect(), pagination(&listing).into())
        };
        let search_box = el("form")
            .attr("method", "post")
            .attr("action", action)
            .child(
                el("input")
                    .attr("type", "text")
                    .attr("name", "search")
                    .id("inventory-search")
                    .class("form-control form-control-sm")
                    .attr("placeholder", "Buscar producto...")
                    .attr("value", state.search.clone())
                    .attr("data-debounce-ms", self.search.delay().as_millis().to_string()),
            );

        el("div")
            .child(metrics)
            .child(row(vec![
                col(
                    "col-lg-8",
                    card(
                        "Niveles de Stock por Categoría",
                        Some(category_filter.into()),
                        charts.slot(STOCK_LEVELS_CHART).await,
                    ),
                ),
                col("col-lg-4", card("Alertas de Stock Bajo", None, alert_list)),
            ]))
            .child(row(vec![
                col(
                    "col-lg-6",
                    card(
                        "Rendimiento de Proveedores",
                        Some(supplier_filter.into()),
                        charts.slot(SUPPLIER_CHART).await,
                    ),
                ),
                col(
                    "col-lg-6",
                    card(
                        "Impacto de Descuentos en Ventas",
                        Some(product_filter.into()),
                        charts.slot(DISCOUNT_CHART).await,
                    ),
                ),
            ]))
            .child(row(vec![col(
                "col-12",
                card(
                    "Listado de Inventario",
                    Some(
                        el("div")
                            .child(search_box)
                            .child(
                                el("a")
                                    .attr("href", "/inventory/export.csv")
                                    .class("btn btn-sm btn-outline-secondary")
                                    .text("Exportar CSV"),
                            )
                            .into(),
                    ),
                    el("div")
                        .child(table(&TABLE_COLUMNS, "inventory-table-body", rows))
                        .child(el("div").class("inventory-pagination mt-3").child(pager)),
                ),
            )]))
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::analytics_api::testing::StubApi;
    use crate::application::section::testing::{ctx, deps, text_of};
    use serde_json::{json, Value};

    const DEBOUNCE: Duration = Duration::from_millis(300);

    fn stock(count: usize) -> Value {
        let categories = ["electronics", "clothing", "home"];
        Value::Array(
            (0..count)
                .map(|i| {
                    json!({
                        "product_id": 1000 + i,
                        "product_name": format!("Producto {}", i),
                        "category": categories[i % 3],
                        "stock_level": (i * 7 % 60) as f64,
                        "threshold": 10,
                        "price": 19.99,
                        "supplier_name": "Textiles Y"
                    })
                })
                .collect(),
        )
    }

    fn body_html(view: &View, id: &str) -> String {
        view.find_by_id(id)
            .map(|e| View::Element(e.clone()).render())
            .unwrap_or_default()
    }

    #[test]
    fn test_group_by_category_bands() {
        let items: Vec<StockItem> = serde_json::from_value(json!([
            {"product_id": 1, "product_name": "A", "category": "home", "stock_level": 4},
            {"product_id": 2, "product_name": "B", "category": "beauty", "stock_level": 10},
            {"product_id": 3, "product_name": "C", "category": "home", "stock_level": 50},
            {"product_id": 4, "product_name": "D", "category": "home", "stock_level": 49}
        ]))
        .unwrap();
        let groups = group_by_category(&items);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "home");
        assert_eq!((groups[0].low, groups[0].optimal, groups[0].excess), (4.0, 49.0, 50.0));
        assert_eq!((groups[1].low, groups[1].optimal, groups[1].excess), (0.0, 10.0, 0.0));
    }

    #[test]
    fn test_paginate_clamps_and_searches() {
        let items: Vec<StockItem> = serde_json::from_value(stock(25)).unwrap();
        let last = paginate(&items, "", 3);
        assert_eq!((last.page, last.total_pages, last.items.len()), (3, 3, 5));
        assert_eq!(paginate(&items, "", 9).page, 3);

        let found = paginate(&items, "producto 2", 1);
        // "Producto 2" and "Producto 20".."Producto 24"
        assert_eq!(found.matched, 6);
        assert_eq!(found.total_pages, 1);
        assert_eq!(paginate(&items, "ninguno", 1).matched, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_raise_toasts_and_leave_widgets_empty() {
        let section = InventorySection::new(deps(Arc::new(StubApi::new())), DEBOUNCE);
        section.show_page(&ctx()).await;

        let messages: Vec<String> = section
            .core
            .deps
            .notifications
            .active()
            .await
            .into_iter()
            .map(|t| t.message)
            .collect();
        assert_eq!(
            messages.iter().filter(|m| *m == "Error al cargar datos de inventario").count(),
            1
        );
        for expected in [
            "Error al cargar datos de inventario",
            "Error al cargar datos de proveedor",
            "Error al cargar datos de descuentos",
        ] {
            assert!(messages.iter().any(|m| m == expected), "{}", expected);
        }

        let view = section.render().await;
        assert_eq!(text_of(&view, "total-stock"), "0");
        assert!(body_html(&view, "low-stock-alerts").contains("Error al cargar alertas"));
        assert!(body_html(&view, "inventory-table-body").contains("No hay productos en el inventario"));
        let charts = &section.core.deps.charts;
        assert_eq!(charts.get(STOCK_LEVELS_CHART).await.unwrap().spec.point_count(), 0);
        assert_eq!(charts.get(SUPPLIER_CHART).await.unwrap().spec.point_count(), 0);
    }

    #[tokio::test]
    async fn test_live_stock_metrics_and_pagination() {
        let api = Arc::new(
            StubApi::new()
                .with("/api/inventory/stock", stock(25))
                .with(
                    "/api/inventory/alerts",
                    json!([{"product_id": 1003, "product_name": "Producto 3", "category": "electronics", "stock_level": 2}]),
                ),
        );
        let section = InventorySection::new(deps(api.clone()), DEBOUNCE);
        section.show_page(&ctx()).await;

        let view = section.render().await;
        let expected: f64 = (0..25).map(|i| (i * 7 % 60) as f64).sum();
        assert_eq!(text_of(&view, "total-stock"), format_locale(expected));
        assert_eq!(text_of(&view, "pending-orders"), "27");
        let alerts = body_html(&view, "low-stock-alerts");
        assert!(alerts.contains("alert-icon critical"));
        assert!(alerts.contains("/inventory/restock/1003"));
        assert_eq!(body_html(&view, "inventory-table-body").matches("<tr>").count(), PAGE_SIZE);
        let stock_requests = api.targets().iter().filter(|t| t.starts_with("/api/inventory/stock")).count();
        assert_eq!(stock_requests, 1);
        assert!(targets_contain(&api, "/api/inventory/supplier_performance?supplier_id=sup1"));
        assert!(targets_contain(&api, "/api/inventory/discount_impact?product_id=prod1"));

        section.apply_filter(SectionFilter::InventoryPage(3), &ctx()).await.unwrap();
        section.apply_filter(SectionFilter::InventoryPage(4), &ctx()).await.unwrap();
        let view = section.render().await;
        assert_eq!(body_html(&view, "inventory-table-body").matches("<tr>").count(), 5);
        assert!(body_html(&view, "inventory-pagination").contains("page-item active\"><button type=\"submit\" name=\"page\" value=\"3\""));
        assert_eq!(section.stock_items().await.len(), 25);
    }

    fn targets_contain(api: &StubApi, target: &str) -> bool {
        api.targets().iter().any(|t| t == target)
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_is_debounced() {
        let api = Arc::new(StubApi::new().with("/api/inventory/stock", stock(25)));
        let section = InventorySection::new(deps(api.clone()), DEBOUNCE);
        section.show_page(&ctx()).await;
        let requests = api.request_count();

        for term in ["p", "producto 1", "producto 12"] {
            section
                .apply_filter(SectionFilter::InventorySearch(term.to_string()), &ctx())
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        // Still inside the window of the last keystroke
        let table = body_html(&section.render().await, "inventory-table-body");
        assert_eq!(table.matches("<tr>").count(), PAGE_SIZE);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let table = body_html(&section.render().await, "inventory-table-body");
        assert_eq!(table.matches("<tr>").count(), 1);
        assert!(table.contains("Producto 12"));
        assert_eq!(api.request_count(), requests);

        section
            .apply_filter(SectionFilter::InventorySearch("zzz".to_string()), &ctx())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        let view = section.render().await;
        assert!(body_html(&view, "inventory-table-body")
            .contains("No se encontraron productos que coincidan con &quot;zzz&quot;"));
        assert!(view.find_by_id("inventory-pagination").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restock_flow() {
        let api = Arc::new(StubApi::new().with("/api/inventory/alerts", json!([])));
        let section = InventorySection::new(deps(api.clone()), DEBOUNCE);
        let notifications = section.core.deps.notifications.clone();

        let pending = section.restock("1003").await;
        let active = notifications.active().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].kind, ToastKind::Info);
        assert_eq!(active[0].message, "Solicitando reposición de stock para el producto 1003");
        assert_eq!(api.request_count(), 0);

        pending.await.unwrap();
        let kinds: Vec<ToastKind> = notifications.active().await.into_iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![ToastKind::Info, ToastKind::Success]);
        assert_eq!(api.targets(), vec!["/api/inventory/alerts".to_string()]);
        assert!(body_html(&section.render().await, "low-stock-alerts").contains("No hay alertas de stock bajo"));
    }

    #[tokio::test]
    async fn test_empty_supplier_skips_request() {
        let api = Arc::new(StubApi::new());
        let section = InventorySection::new(deps(api.clone()), DEBOUNCE);
        section.apply_filter(SectionFilter::Supplier(String::new()), &ctx()).await.unwrap();
        assert_eq!(api.request_count(), 0);

        section.apply_filter(SectionFilter::Supplier("sup3".to_string()), &ctx()).await.unwrap();
        assert_eq!(api.targets(), vec!["/api/inventory/supplier_performance?supplier_id=sup3".to_string()]);
    }
}
