use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::products::{
    dto::{CreateProductRequest, UpdateProductRequest},
    repo::{ProductRepository, RepoError},
    repo_types::{NewProduct, Product},
};

pub(crate) const MSG_LIST_EMPTY: &str = "No hay productos registrados.";
pub(crate) const MSG_LIST_FAILED: &str = "Error al acceder a la base de datos.";
pub(crate) const MSG_FIELDS_REQUIRED: &str = "Todos los campos son obligatorios.";
pub(crate) const MSG_DUPLICATE: &str = "Ese producto ya existe en la base de datos.";
pub(crate) const MSG_STOCK_POSITIVE: &str = "El stock debe ser mayor a 0.";
pub(crate) const MSG_CREATED: &str = "Producto creado correctamente.";
pub(crate) const MSG_CREATE_FAILED: &str = "Error al guardar el producto.";
pub(crate) const MSG_ID_REQUIRED: &str = "Debe indicar el ID del producto.";
pub(crate) const MSG_GET_NOT_FOUND: &str =
    "El producto con el ID indicado no existe en la base de datos.";
pub(crate) const MSG_GET_FAILED: &str = "Error al obtener el producto.";
pub(crate) const MSG_NOT_FOUND: &str = "Producto no encontrado.";
pub(crate) const MSG_UPDATED: &str = "Producto actualizado correctamente.";
pub(crate) const MSG_UPDATE_FAILED: &str = "Error al actualizar el producto.";
pub(crate) const MSG_DELETED: &str = "Producto eliminado correctamente.";
pub(crate) const MSG_DELETE_FAILED: &str = "Error al eliminar el producto.";
pub(crate) const MSG_EMPTY_NAME: &str = "El nombre no puede estar vacío.";
pub(crate) const MSG_EMPTY_CATEGORY: &str = "La categoría no puede estar vacía.";
pub(crate) const MSG_NEGATIVE_PRICE: &str = "El precio no puede ser negativo.";
pub(crate) const MSG_NEGATIVE_STOCK: &str = "El stock no puede ser negativo.";
pub(crate) const MSG_INVALID_BODY: &str = "Datos del producto inválidos.";

/// Parses a path id. Anything that is not a non-zero integer is rejected.
pub fn parse_id(raw: &str) -> Result<i32, ApiError> {
    match raw.trim().parse::<i32>() {
        Ok(id) if id != 0 => Ok(id),
        _ => Err(ApiError::validation(MSG_ID_REQUIRED)),
    }
}

pub async fn list_active(repo: &dyn ProductRepository) -> Result<Vec<Product>, ApiError> {
    let products = repo
        .find_active()
        .await
        .map_err(|e| ApiError::internal(MSG_LIST_FAILED, e))?;
    if products.is_empty() {
        return Err(ApiError::not_found(MSG_LIST_EMPTY));
    }
    debug!(count = products.len(), "listed active products");
    Ok(products)
}

pub async fn create(
    repo: &dyn ProductRepository,
    req: CreateProductRequest,
) -> Result<Product, ApiError> {
    let new = required_fields(req)?;

    match repo.find_by_id(new.id).await {
        Ok(Some(_)) => {
            warn!(id = new.id, "product already exists");
            return Err(ApiError::validation(MSG_DUPLICATE));
        }
        Ok(None) => {}
        Err(e) => return Err(ApiError::internal(MSG_CREATE_FAILED, e)),
    }

    if new.stock <= 0 {
        return Err(ApiError::validation(MSG_STOCK_POSITIVE));
    }

    // The existence check above can race with a concurrent insert; the key
    // constraint catches that case.
    let product = repo.insert(new).await.map_err(|e| match e {
        RepoError::Duplicate(id) => {
            warn!(id, "product inserted concurrently");
            ApiError::validation(MSG_DUPLICATE)
        }
        other => ApiError::internal(MSG_CREATE_FAILED, other),
    })?;

    info!(id = product.id, "product created");
    Ok(product)
}

pub async fn get_one(repo: &dyn ProductRepository, id: i32) -> Result<Product, ApiError> {
    repo.get_by_id(id).await.map_err(|e| match e {
        RepoError::NotFound(_) => ApiError::not_found(MSG_GET_NOT_FOUND),
        other => ApiError::internal(MSG_GET_FAILED, other),
    })
}

/// A body that failed to decode is only reported once the product is known
/// to exist, so a missing id is always a 404.
pub async fn update(
    repo: &dyn ProductRepository,
    id: i32,
    req: Result<UpdateProductRequest, ApiError>,
) -> Result<Product, ApiError> {
    let mut product = repo
        .find_by_id(id)
        .await
        .map_err(|e| ApiError::internal(MSG_UPDATE_FAILED, e))?
        .ok_or_else(|| ApiError::not_found(MSG_NOT_FOUND))?;

    apply_update(&mut product, req?)?;

    let product = repo.save(product).await.map_err(|e| match e {
        // Deleted between load and save.
        RepoError::NotFound(_) => ApiError::not_found(MSG_NOT_FOUND),
        other => ApiError::internal(MSG_UPDATE_FAILED, other),
    })?;

    info!(id, "product updated");
    Ok(product)
}

pub async fn delete(repo: &dyn ProductRepository, id: i32) -> Result<(), ApiError> {
    let exists = repo
        .find_by_id(id)
        .await
        .map_err(|e| ApiError::internal(MSG_DELETE_FAILED, e))?
        .is_some();
    if !exists {
        return Err(ApiError::not_found(MSG_NOT_FOUND));
    }

    repo.delete(id)
        .await
        .map_err(|e| ApiError::internal(MSG_DELETE_FAILED, e))?;

    info!(id, "product deleted");
    Ok(())
}

fn required_fields(req: CreateProductRequest) -> Result<NewProduct, ApiError> {
    let CreateProductRequest {
        id: Some(id),
        name: Some(name),
        price: Some(price),
        stock: Some(stock),
        category: Some(category),
    } = req
    else {
        return Err(ApiError::validation(MSG_FIELDS_REQUIRED));
    };

    if id <= 0 || name.trim().is_empty() || category.trim().is_empty() {
        return Err(ApiError::validation(MSG_FIELDS_REQUIRED));
    }
    if price < 0.0 {
        return Err(ApiError::validation(MSG_NEGATIVE_PRICE));
    }

    Ok(NewProduct {
        id,
        name,
        price,
        stock,
        category,
    })
}

/// Present fields replace stored values; absent ones are kept.
fn apply_update(product: &mut Product, req: UpdateProductRequest) -> Result<(), ApiError> {
    if let Some(name) = req.name {
        if name.trim().is_empty() {
            return Err(ApiError::validation(MSG_EMPTY_NAME));
        }
        product.name = name;
    }
    if let Some(price) = req.price {
        if price < 0.0 {
            return Err(ApiError::validation(MSG_NEGATIVE_PRICE));
        }
        product.price = price;
    }
    if let Some(stock) = req.stock {
        if stock < 0 {
            return Err(ApiError::validation(MSG_NEGATIVE_STOCK));
        }
        product.stock = stock;
    }
    if let Some(category) = req.category {
        if category.trim().is_empty() {
            return Err(ApiError::validation(MSG_EMPTY_CATEGORY));
        }
        product.category = category;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::products::repo::MemoryProductRepository;
    use async_trait::async_trait;

    fn create_req(id: i32, stock: i32) -> CreateProductRequest {
        CreateProductRequest {
            id: Some(id),
            name: Some("A".into()),
            price: Some(10.0),
            stock: Some(stock),
            category: Some("x".into()),
        }
    }

    fn message(err: &ApiError) -> String {
        match err {
            ApiError::Validation(m) | ApiError::NotFound(m) => m.clone(),
            ApiError::Internal { message, .. } => message.clone(),
        }
    }

    /// Repository whose existence check always misses, so inserts race.
    struct RacingRepo(MemoryProductRepository);

    #[async_trait]
    impl ProductRepository for RacingRepo {
        async fn find_active(&self) -> Result<Vec<Product>, RepoError> {
            self.0.find_active().await
        }
        async fn find_by_id(&self, _id: i32) -> Result<Option<Product>, RepoError> {
            Ok(None)
        }
        async fn insert(&self, product: NewProduct) -> Result<Product, RepoError> {
            self.0.insert(product).await
        }
        async fn save(&self, product: Product) -> Result<Product, RepoError> {
            self.0.save(product).await
        }
        async fn delete(&self, id: i32) -> Result<(), RepoError> {
            self.0.delete(id).await
        }
    }

    /// Repository that fails every call.
    struct BrokenRepo;

    #[async_trait]
    impl ProductRepository for BrokenRepo {
        async fn find_active(&self) -> Result<Vec<Product>, RepoError> {
            Err(RepoError::Database(sqlx::Error::PoolClosed))
        }
        async fn find_by_id(&self, _id: i32) -> Result<Option<Product>, RepoError> {
            Err(RepoError::Database(sqlx::Error::PoolClosed))
        }
        async fn insert(&self, _product: NewProduct) -> Result<Product, RepoError> {
            Err(RepoError::Database(sqlx::Error::PoolClosed))
        }
        async fn save(&self, _product: Product) -> Result<Product, RepoError> {
            Err(RepoError::Database(sqlx::Error::PoolClosed))
        }
        async fn delete(&self, _id: i32) -> Result<(), RepoError> {
            Err(RepoError::Database(sqlx::Error::PoolClosed))
        }
    }

    #[test]
    fn parse_id_rejects_zero_and_garbage() {
        assert_eq!(parse_id("12").unwrap(), 12);
        for raw in ["0", "abc", "", "1.5", "99999999999"] {
            let err = parse_id(raw).unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "{raw}");
        }
    }

    #[tokio::test]
    async fn list_of_nothing_is_not_found() {
        let repo = MemoryProductRepository::new();
        let err = list_active(&repo).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(message(&err), MSG_LIST_EMPTY);
    }

    #[tokio::test]
    async fn create_checks_fields_then_duplicate_then_stock() {
        let repo = MemoryProductRepository::new();

        let err = create(&repo, CreateProductRequest { stock: None, ..create_req(1, 5) })
            .await
            .unwrap_err();
        assert_eq!(message(&err), MSG_FIELDS_REQUIRED);

        create(&repo, create_req(1, 5)).await.expect("first create");

        // Duplicate wins over the stock check.
        let err = create(&repo, create_req(1, 0)).await.unwrap_err();
        assert_eq!(message(&err), MSG_DUPLICATE);

        let err = create(&repo, create_req(2, 0)).await.unwrap_err();
        assert_eq!(message(&err), MSG_STOCK_POSITIVE);
        assert!(repo.find_by_id(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_accepts_zero_price_and_rejects_blank_strings() {
        let repo = MemoryProductRepository::new();
        let free = CreateProductRequest { price: Some(0.0), ..create_req(3, 1) };
        let product = create(&repo, free).await.expect("zero price is a value");
        assert_eq!(product.price, 0.0);
        assert!(product.active);

        let blank = CreateProductRequest { name: Some("  ".into()), ..create_req(4, 1) };
        let err = create(&repo, blank).await.unwrap_err();
        assert_eq!(message(&err), MSG_FIELDS_REQUIRED);

        let negative = CreateProductRequest { price: Some(-1.0), ..create_req(5, 1) };
        let err = create(&repo, negative).await.unwrap_err();
        assert_eq!(message(&err), MSG_NEGATIVE_PRICE);
    }

    #[tokio::test]
    async fn create_maps_key_conflict_to_duplicate() {
        let repo = RacingRepo(MemoryProductRepository::new());
        create(&repo, create_req(9, 1)).await.expect("first insert");
        let err = create(&repo, create_req(9, 1)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(message(&err), MSG_DUPLICATE);
    }

    #[tokio::test]
    async fn get_one_distinguishes_missing_from_broken() {
        let err = get_one(&MemoryProductRepository::new(), 3).await.unwrap_err();
        assert_eq!(message(&err), MSG_GET_NOT_FOUND);

        let err = get_one(&BrokenRepo, 3).await.unwrap_err();
        assert!(matches!(err, ApiError::Internal { .. }));
        assert_eq!(message(&err), MSG_GET_FAILED);
    }

    #[tokio::test]
    async fn update_only_touches_present_fields() {
        let repo = MemoryProductRepository::new();
        create(&repo, create_req(1, 5)).await.unwrap();

        let req = UpdateProductRequest { name: Some("B".into()), ..Default::default() };
        let updated = update(&repo, 1, Ok(req)).await.unwrap();
        assert_eq!(updated.name, "B");
        assert_eq!(updated.price, 10.0);
        assert_eq!(updated.stock, 5);
        assert_eq!(updated.category, "x");

        // Zero is a real value now, not a missing one.
        let req = UpdateProductRequest { stock: Some(0), ..Default::default() };
        assert_eq!(update(&repo, 1, Ok(req)).await.unwrap().stock, 0);

        let req = UpdateProductRequest { category: Some(String::new()), ..Default::default() };
        let err = update(&repo, 1, Ok(req)).await.unwrap_err();
        assert_eq!(message(&err), MSG_EMPTY_CATEGORY);
    }

    #[tokio::test]
    async fn update_and_delete_missing_are_not_found() {
        let repo = MemoryProductRepository::new();
        let err = update(&repo, 8, Ok(UpdateProductRequest::default())).await.unwrap_err();
        assert_eq!(message(&err), MSG_NOT_FOUND);

        create(&repo, create_req(8, 2)).await.unwrap();
        delete(&repo, 8).await.unwrap();
        let err = delete(&repo, 8).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn repository_failures_surface_as_internal() {
        let err = list_active(&BrokenRepo).await.unwrap_err();
        assert_eq!(message(&err), MSG_LIST_FAILED);
        let err = create(&BrokenRepo, create_req(1, 1)).await.unwrap_err();
        assert_eq!(message(&err), MSG_CREATE_FAILED);
        let err = update(&BrokenRepo, 1, Ok(UpdateProductRequest::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal { .. }));
        assert_eq!(message(&err), MSG_UPDATE_FAILED);
        let err = delete(&BrokenRepo, 1).await.unwrap_err();
        assert_eq!(message(&err), MSG_DELETE_FAILED);
    }

    #[tokio::test]
    async fn update_reports_missing_product_before_a_bad_body() {
        let repo = MemoryProductRepository::new();
        let bad_body = Err(ApiError::validation(MSG_INVALID_BODY));
        let err = update(&repo, 4, bad_body).await.unwrap_err();
        assert_eq!(message(&err), MSG_NOT_FOUND);

        create(&repo, create_req(4, 2)).await.unwrap();
        let bad_body = Err(ApiError::validation(MSG_INVALID_BODY));
        let err = update(&repo, 4, bad_body).await.unwrap_err();
        assert_eq!(message(&err), MSG_INVALID_BODY);
        assert_eq!(repo.get_by_id(4).await.unwrap().stock, 2);
    }
}
