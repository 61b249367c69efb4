// Dashboard pages (one per sidebar tab)
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Page {
    Dashboard,
    Customer,
    Reviews,
    Ml,
    Inventory,
    Settings,
}

impl Page {
    pub const ALL: [Page; 6] = [
        Page::Dashboard,
        Page::Customer,
        Page::Reviews,
        Page::Ml,
        Page::Inventory,
        Page::Settings,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Page::Dashboard => "dashboard",
            Page::Customer => "customer",
            Page::Reviews => "reviews",
            Page::Ml => "ml",
            Page::Inventory => "inventory",
            Page::Settings => "settings",
        }
    }

    /// Header label shown while the page is active
    pub fn title(&self) -> &'static str {
        match self {
            Page::Dashboard => "Dashboard Principal",
            Page::Customer => "Comportamiento del Cliente",
            Page::Reviews => "Análisis de Reviews",
            Page::Ml => "Machine Learning",
            Page::Inventory => "Gestión de Inventario",
            Page::Settings => "Configuraciones",
        }
    }

    pub fn nav_label(&self) -> &'static str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Customer => "Clientes",
            Page::Reviews => "Reviews",
            Page::Ml => "Machine Learning",
            Page::Inventory => "Inventario",
            Page::Settings => "Configuración",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Page::Dashboard => "fas fa-tachometer-alt",
            Page::Customer => "fas fa-users",
            Page::Reviews => "fas fa-star",
            Page::Ml => "fas fa-brain",
            Page::Inventory => "fas fa-boxes",
            Page::Settings => "fas fa-cog",
        }
    }

    /// Permission tag required to open the page
    pub fn permission(&self) -> String {
        format!("view_{}", self.slug())
    }

    /// Id of the page container element
    pub fn container_id(&self) -> String {
        format!("{}-page", self.slug())
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown page: {0}")]
pub struct UnknownPage(pub String);

impl FromStr for Page {
    type Err = UnknownPage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Page::ALL
            .into_iter()
            .find(|p| p.slug() == s)
            .ok_or_else(|| UnknownPage(s.to_string()))
    }
}
