use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use lotledger_catalog::{
    ContactInfo, Department, DepartmentId, Ingredient, IngredientId, Packaging, PackagingId,
    Product, ProductId, Recipe, RecipeId, RecipeIngredient, Supplier, SupplierDepartment,
    SupplierId,
};
use lotledger_core::{Entity, UserId};
use lotledger_quality::{QualityCheckType, QualityCheckTypeId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/departments", post(create_department))
        .route("/suppliers", post(create_supplier))
        .route(
            "/suppliers/:id/departments/:department_id",
            post(link_supplier_department),
        )
        .route("/packaging", post(create_packaging))
        .route("/products", post(create_product).get(list_products))
        .route("/products/:id", get(get_product))
        .route("/products/:id/deactivate", post(deactivate_product))
        .route("/ingredients", post(register_ingredient))
        .route("/recipes", post(create_recipe))
        .route("/quality-check-types", post(create_check_type))
        .route("/users", post(register_user))
}

fn created(id: impl ToString) -> axum::response::Response {
    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": id.to_string() })),
    )
        .into_response()
}

pub async fn create_department(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateDepartmentRequest>,
) -> axum::response::Response {
    let department = match Department::new(DepartmentId::new(), body.code, body.name, Utc::now())
    {
        Ok(d) => d,
        Err(e) => return errors::ledger_error_to_response(e),
    };
    let id = *department.id();
    match services.catalog.create_department(department).await {
        Ok(()) => created(id),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn create_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateSupplierRequest>,
) -> axum::response::Response {
    let contact = ContactInfo {
        email: body.email,
        phone: body.phone,
        address: body.address,
    };
    let supplier =
        match Supplier::new(SupplierId::new(), body.code, body.name, contact, Utc::now()) {
            Ok(s) => s,
            Err(e) => return errors::ledger_error_to_response(e),
        };
    let id = *supplier.id();
    match services.catalog.create_supplier(supplier).await {
        Ok(()) => created(id),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn link_supplier_department(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, department_id)): Path<(SupplierId, DepartmentId)>,
) -> axum::response::Response {
    match services
        .catalog
        .link_supplier_department(SupplierDepartment {
            supplier_id: id,
            department_id,
        })
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn create_packaging(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreatePackagingRequest>,
) -> axum::response::Response {
    let packaging =
        match Packaging::new(PackagingId::new(), body.description, body.units_per_package) {
            Ok(p) => p,
            Err(e) => return errors::ledger_error_to_response(e),
        };
    let id = *packaging.id();
    match services.catalog.create_packaging(packaging).await {
        Ok(()) => created(id),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    let product = match Product::new(
        ProductId::new(),
        body.sku,
        body.name,
        body.department_id,
        body.unit,
        body.packaging_id,
        body.default_supplier_id,
        Utc::now(),
    ) {
        Ok(p) => p,
        Err(e) => return errors::ledger_error_to_response(e),
    };
    let id = *product.id();
    match services.catalog.create_product(product).await {
        Ok(()) => created(id),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<ProductId>,
) -> axum::response::Response {
    match services.catalog.get_product(id).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.catalog.list_products().await {
        Ok(products) => (StatusCode::OK, Json(products)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn deactivate_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<ProductId>,
) -> axum::response::Response {
    match services.catalog.deactivate_product(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn register_ingredient(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterIngredientRequest>,
) -> axum::response::Response {
    let ingredient = Ingredient::new(
        IngredientId::new(),
        body.product_id,
        body.allergen,
        body.notes,
    );
    let id = *ingredient.id();
    match services.catalog.register_ingredient(ingredient).await {
        Ok(()) => created(id),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn create_recipe(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateRecipeRequest>,
) -> axum::response::Response {
    let ingredients = body
        .ingredients
        .into_iter()
        .map(|i| RecipeIngredient {
            product_id: i.product_id,
            quantity_per_batch: i.quantity_per_batch,
        })
        .collect();
    let recipe = match Recipe::new(
        RecipeId::new(),
        body.name,
        body.output_product_id,
        body.output_quantity,
        ingredients,
        Utc::now(),
    ) {
        Ok(r) => r,
        Err(e) => return errors::ledger_error_to_response(e),
    };
    let id = *recipe.id();
    match services.catalog.create_recipe(recipe).await {
        Ok(()) => created(id),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn create_check_type(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateCheckTypeRequest>,
) -> axum::response::Response {
    let check_type = match QualityCheckType::new(
        QualityCheckTypeId::new(),
        body.name,
        body.description,
        body.department_id,
        Utc::now(),
    ) {
        Ok(t) => t,
        Err(e) => return errors::ledger_error_to_response(e),
    };
    let id = *check_type.id();
    match services.catalog.create_check_type(check_type).await {
        Ok(()) => created(id),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn register_user(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterUserRequest>,
) -> axum::response::Response {
    let user_id = body.user_id.unwrap_or_else(UserId::new);
    match services
        .catalog
        .register_user(user_id, body.display_name)
        .await
    {
        Ok(()) => created(user_id),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
