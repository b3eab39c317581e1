//! Catalog domain module: long-lived reference data.
//!
//! Departments, suppliers, packaging, ingredient metadata, products, and
//! recipes. Reference data is created by administrative action and
//! soft-deactivated rather than deleted; business rules live in validated
//! constructors so a value of one of these types is well-formed by
//! construction.

pub mod department;
pub mod packaging;
pub mod product;
pub mod recipe;
pub mod supplier;

pub use department::{Department, DepartmentId};
pub use packaging::{Packaging, PackagingId};
pub use product::{Ingredient, IngredientId, Product, ProductId, ProductStatus};
pub use recipe::{Recipe, RecipeId, RecipeIngredient};
pub use supplier::{ContactInfo, Supplier, SupplierDepartment, SupplierId, SupplierStatus};
