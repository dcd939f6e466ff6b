use std::fmt;
use std::str::FromStr;

/// Backend collections managed from the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Product,
    Order,
    Brand,
    Category,
    Coupon,
    Employee,
    Role,
    Department,
}

impl Entity {
    pub const ALL: [Entity; 8] = [
        Entity::Product,
        Entity::Order,
        Entity::Brand,
        Entity::Category,
        Entity::Coupon,
        Entity::Employee,
        Entity::Role,
        Entity::Department,
    ];

    /// Collection path under the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            Entity::Product => "/products",
            Entity::Order => "/orders",
            Entity::Brand => "/brands",
            Entity::Category => "/categories",
            Entity::Coupon => "/coupons",
            Entity::Employee => "/employees",
            Entity::Role => "/roles",
            Entity::Department => "/departments",
        }
    }

    /// Table name the audit log is keyed by
    pub fn table_name(&self) -> &'static str {
        match self {
            Entity::Product => "Product",
            Entity::Order => "Order",
            Entity::Brand => "Brand",
            Entity::Category => "Category",
            Entity::Coupon => "Coupon",
            Entity::Employee => "Employee",
            Entity::Role => "Role",
            Entity::Department => "Department",
        }
    }

    pub fn plural(&self) -> &'static str {
        &self.path()[1..]
    }

    /// Orders come from the storefront; the back office only updates them.
    pub fn supports_create(&self) -> bool {
        !matches!(self, Entity::Order)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for Entity {
    type Err = String;

    /// Accepts singular or plural, any case: "product", "Products", "categories".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Entity::ALL
            .into_iter()
            .find(|e| e.table_name().to_lowercase() == lower || e.plural() == lower)
            .ok_or_else(|| {
                let known: Vec<&str> = Entity::ALL.iter().map(|e| e.plural()).collect();
                format!("unknown entity '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_and_tables() {
        assert_eq!(Entity::Category.path(), "/categories");
        assert_eq!(Entity::Category.plural(), "categories");
        assert_eq!(Entity::Category.table_name(), "Category");
        assert!(!Entity::Order.supports_create());
        assert!(Entity::Coupon.supports_create());
    }

    #[test]
    fn test_parse() {
        assert_eq!("product".parse::<Entity>(), Ok(Entity::Product));
        assert_eq!("Departments".parse::<Entity>(), Ok(Entity::Department));
        assert_eq!("categories".parse::<Entity>(), Ok(Entity::Category));
        assert!("warehouse".parse::<Entity>().is_err());
    }
}
