// Typed chart descriptions and their ApexCharts option mapping
use super::analytics::HeatPoint;
use super::theme::ResolvedTheme;
use serde_json::{json, Value};

/// Evenly spaced HSL hues, one per item
pub fn generate_colors(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let hue = (360.0 * (i as f64 / count as f64)).floor() as u32;
            format!("hsl({}, 70%, 60%)", hue)
        })
        .collect()
}

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Linear interpolation between two `#rrggbb` colors, `value` in 0..1.
/// Unparsable colors yield `start` unchanged.
pub fn gradient_color(value: f64, start: &str, end: &str) -> String {
    let (Some(s), Some(e)) = (parse_hex(start), parse_hex(end)) else {
        return start.to_string();
    };
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * value).floor().clamp(0.0, 255.0) as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        lerp(s.0, e.0),
        lerp(s.1, e.1),
        lerp(s.2, e.2)
    )
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Palette {
    Fixed(Vec<String>),
    #[default]
    Generated,
}

impl Palette {
    pub fn fixed(colors: &[&str]) -> Self {
        Palette::Fixed(colors.iter().map(|c| c.to_string()).collect())
    }

    pub fn resolve(&self, count: usize) -> Vec<String> {
        match self {
            Palette::Fixed(colors) => colors.clone(),
            Palette::Generated => generate_colors(count),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub data: Vec<f64>,
}

impl Series {
    pub fn new(name: &str, data: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Axis {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub title: Option<String>,
}

impl Axis {
    pub fn range(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            title: None,
        }
    }

    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Self::default()
        }
    }

    fn to_options(&self, theme: ResolvedTheme) -> Value {
        let mut axis = json!({ "labels": { "style": { "colors": theme.foreground() } } });
        if let Some(min) = self.min {
            axis["min"] = json!(min);
        }
        if let Some(max) = self.max {
            axis["max"] = json!(max);
        }
        if let Some(title) = &self.title {
            axis["title"] = json!({ "text": title });
        }
        axis
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarChart {
    pub categories: Vec<String>,
    pub series: Vec<Series>,
    pub horizontal: bool,
    pub stacked: bool,
    /// One color per category instead of per series
    pub distributed: bool,
    pub colors: Palette,
    pub y_axis: Axis,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineChart {
    pub categories: Vec<String>,
    pub series: Vec<Series>,
    /// Filled gradient area under the line
    pub area: bool,
    pub colors: Palette,
    pub y_axis: Axis,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PieChart {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub donut: bool,
    pub colors: Palette,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadarChart {
    pub categories: Vec<String>,
    pub series: Vec<Series>,
    pub colors: Palette,
    pub y_axis: Axis,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeatmapChart {
    pub points: Vec<HeatPoint>,
    pub max: f64,
    pub radius: u32,
}

/// Columns on the primary axis, a line on the secondary one
#[derive(Debug, Clone, PartialEq)]
pub struct ComboChart {
    pub categories: Vec<String>,
    pub column: Series,
    pub line: Series,
    pub colors: Palette,
    pub column_title: String,
    pub line_title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartSpec {
    Bar(BarChart),
    Line(LineChart),
    Pie(PieChart),
    Radar(RadarChart),
    Heatmap(HeatmapChart),
    Combo(ComboChart),
}

impl ChartSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            ChartSpec::Bar(_) => "bar",
            ChartSpec::Line(c) if c.area => "area",
            ChartSpec::Line(_) => "line",
            ChartSpec::Pie(c) if c.donut => "donut",
            ChartSpec::Pie(_) => "pie",
            ChartSpec::Radar(_) => "radar",
            ChartSpec::Heatmap(_) => "heatmap",
            ChartSpec::Combo(_) => "combo",
        }
    }

    /// Total number of data points across all series
    #[cfg(test)]
    pub fn point_count(&self) -> usize {
        let sum = |series: &[Series]| series.iter().map(|s| s.data.len()).sum::<usize>();
        match self {
            ChartSpec::Bar(c) => sum(&c.series),
            ChartSpec::Line(c) => sum(&c.series),
            ChartSpec::Pie(c) => c.values.len(),
            ChartSpec::Radar(c) => sum(&c.series),
            ChartSpec::Heatmap(c) => c.points.len(),
            ChartSpec::Combo(c) => c.column.data.len() + c.line.data.len(),
        }
    }

    /// Options object handed to the charting library. Colors depend on the
    /// theme, so this is recomputed whenever the theme changes.
    pub fn to_options(&self, theme: ResolvedTheme, animations: bool) -> Value {
        match self {
            ChartSpec::Heatmap(c) => heatmap_options(c),
            ChartSpec::Bar(c) => {
                let mut options = base_options("bar", 350, theme, animations);
                options["series"] = series_json(&c.series);
                options["xaxis"] = categories_axis(&c.categories, theme);
                options["yaxis"] = c.y_axis.to_options(theme);
                options["colors"] = json!(c.colors.resolve(color_count(c)));
                options["plotOptions"] = json!({
                    "bar": {
                        "horizontal": c.horizontal,
                        "distributed": c.distributed,
                        "borderRadius": 4
                    }
                });
                if c.stacked {
                    options["chart"]["stacked"] = json!(true);
                }
                if c.distributed {
                    options["legend"] = json!({ "show": false });
                }
                options
            }
            ChartSpec::Line(c) => {
                let kind = if c.area { "area" } else { "line" };
                let mut options = base_options(kind, 350, theme, animations);
                options["series"] = series_json(&c.series);
                options["xaxis"] = categories_axis(&c.categories, theme);
                options["yaxis"] = c.y_axis.to_options(theme);
                options["colors"] = json!(c.colors.resolve(c.series.len()));
                options["stroke"] = json!({ "curve": "smooth", "width": if c.area { 3 } else { 2 } });
                if c.area {
                    options["fill"] = json!({
                        "type": "gradient",
                        "gradient": { "shadeIntensity": 1, "opacityFrom": 0.7, "opacityTo": 0.2, "stops": [0, 90, 100] }
                    });
                }
                options
            }
            ChartSpec::Pie(c) => {
                let kind = if c.donut { "donut" } else { "pie" };
                let mut options = base_options(kind, 350, theme, animations);
                options["series"] = json!(c.values);
                options["labels"] = json!(c.labels);
                options["colors"] = json!(c.colors.resolve(c.values.len()));
                options["legend"] = json!({ "position": "bottom", "labels": { "colors": theme.foreground() } });
                options
            }
            ChartSpec::Radar(c) => {
                let mut options = base_options("radar", 350, theme, animations);
                options["series"] = series_json(&c.series);
                options["xaxis"] = categories_axis(&c.categories, theme);
                options["yaxis"] = c.y_axis.to_options(theme);
                options["colors"] = json!(c.colors.resolve(c.series.len()));
                options["markers"] = json!({ "size": 4 });
                options
            }
            ChartSpec::Combo(c) => {
                let mut options = base_options("line", 350, theme, animations);
                options["series"] = json!([
                    { "name": c.column.name, "type": "column", "data": c.column.data },
                    { "name": c.line.name, "type": "line", "data": c.line.data }
                ]);
                options["xaxis"] = categories_axis(&c.categories, theme);
                options["yaxis"] = json!([
                    { "title": { "text": c.column_title } },
                    { "opposite": true, "title": { "text": c.line_title } }
                ]);
                options["colors"] = json!(c.colors.resolve(2));
                options["stroke"] = json!({ "width": [0, 4] });
                options
            }
        }
    }
}

fn color_count(chart: &BarChart) -> usize {
    if chart.distributed {
        chart.categories.len()
    } else {
        chart.series.len()
    }
}

fn base_options(kind: &str, height: u32, theme: ResolvedTheme, animations: bool) -> Value {
    json!({
        "chart": {
            "type": kind,
            "height": height,
            "toolbar": { "show": false },
            "animations": { "enabled": animations },
            "foreColor": theme.foreground(),
            "background": "transparent"
        },
        "theme": { "mode": theme.mode() },
        "grid": { "borderColor": theme.grid_color() },
        "dataLabels": { "enabled": false }
    })
}

fn series_json(series: &[Series]) -> Value {
    Value::Array(
        series
            .iter()
            .map(|s| json!({ "name": s.name, "data": s.data }))
            .collect(),
    )
}

fn categories_axis(categories: &[String], theme: ResolvedTheme) -> Value {
    json!({
        "categories": categories,
        "labels": { "style": { "colors": theme.foreground() } }
    })
}

fn heatmap_options(chart: &HeatmapChart) -> Value {
    json!({
        "renderer": "heatmap",
        "config": { "radius": chart.radius, "maxOpacity": 0.8, "minOpacity": 0, "blur": 0.8 },
        "data": { "max": chart.max, "data": chart.points }
    })
}
