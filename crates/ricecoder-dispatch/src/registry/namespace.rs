//! Prefixed method definition

use std::future::Future;

use serde_json::Value;

use crate::dispatcher::{InvocationContext, Store};
use crate::registry::Handler;
use crate::taxonomy::AppError;

/// Normalize a directory-like path into a method name prefix
///
/// Separators may be `/` or `\`; empty and `.` segments are dropped, so
/// `./api/v1/` and `api\v1` both become `api/v1`, and `.` becomes the root
/// (an empty prefix).
pub fn normalize_namespace(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Defines methods on a store under a common prefix
///
/// ```ignore
/// let mut api = store.namespace("api");
/// api.define("createPost", create_post)?;      // api/createPost
/// api.namespace("admin").define("ban", ban)?;  // api/admin/ban
/// ```
pub struct Namespace<'a> {
    store: &'a mut Store,
    prefix: String,
}

impl<'a> Namespace<'a> {
    pub(crate) fn new(store: &'a mut Store, prefix: &str) -> Self {
        Self {
            store,
            prefix: normalize_namespace(prefix),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full method name for `name` within this namespace
    pub fn qualify(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }

    pub fn define<F, Fut>(&mut self, name: &str, handler: F) -> Result<&mut Self, AppError>
    where
        F: Fn(Value, InvocationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.define_with_meta(name, handler, Value::Null)
    }

    pub fn define_with_meta<F, Fut>(
        &mut self,
        name: &str,
        handler: F,
        meta: Value,
    ) -> Result<&mut Self, AppError>
    where
        F: Fn(Value, InvocationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.define_handler(name, handler, meta)
    }

    pub fn define_handler(
        &mut self,
        name: &str,
        handler: impl Handler + 'static,
        meta: Value,
    ) -> Result<&mut Self, AppError> {
        let full_name = self.qualify(name);
        self.store.define_handler(&full_name, handler, meta)?;
        Ok(self)
    }

    /// Define a method named after the namespace itself
    ///
    /// In a module bound to `users/create` this registers `users/create`.
    /// The root namespace has no name, so defining on it fails validation.
    pub fn define_default<F, Fut>(&mut self, handler: F) -> Result<&mut Self, AppError>
    where
        F: Fn(Value, InvocationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let name = self.prefix.clone();
        self.store.define_handler(&name, handler, Value::Null)?;
        Ok(self)
    }

    /// A nested namespace, `prefix` relative to this one
    pub fn namespace(&mut self, prefix: &str) -> Namespace<'_> {
        let nested = self.qualify(&normalize_namespace(prefix));
        Namespace::new(self.store, &nested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::ErrorKind;

    #[test]
    fn test_normalize_namespace() {
        assert_eq!(normalize_namespace("api"), "api");
        assert_eq!(normalize_namespace("./api/v1/"), "api/v1");
        assert_eq!(normalize_namespace("api\\v1"), "api/v1");
        assert_eq!(normalize_namespace("/api//v1"), "api/v1");
        assert_eq!(normalize_namespace("."), "");
        assert_eq!(normalize_namespace(""), "");
    }

    #[test]
    fn test_namespace_prefixes_names() {
        let mut store = Store::new();
        {
            let mut api = store.namespace("api");
            api.define("createPost", |_p: Value, _c: InvocationContext| async {
                Ok(Value::Null)
            })
            .unwrap();
            api.namespace("admin")
                .define("ban", |_p: Value, _c: InvocationContext| async { Ok(Value::Null) })
                .unwrap();
        }
        store
            .namespace(".")
            .define("root", |_p: Value, _c: InvocationContext| async { Ok(Value::Null) })
            .unwrap();

        assert_eq!(
            store.registry().names(),
            vec!["api/admin/ban", "api/createPost", "root"]
        );
    }

    #[tokio::test]
    async fn test_define_default_uses_namespace_name() {
        let mut store = Store::new();
        store
            .namespace("./users/create")
            .define_default(|_p: Value, ctx: InvocationContext| async move {
                Ok(Value::String(ctx.method().to_string()))
            })
            .unwrap();

        assert_eq!(store.registry().names(), vec!["users/create"]);
        assert_eq!(
            store.call("users/create", Value::Null).await.unwrap(),
            Value::String("users/create".to_string())
        );

        let err = store
            .namespace(".")
            .define_default(|_p: Value, _c: InvocationContext| async { Ok(Value::Null) })
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_namespace_validates_full_name() {
        let mut store = Store::new();
        let err = store
            .namespace("v-1")
            .define("ok", |_p: Value, _c: InvocationContext| async { Ok(Value::Null) })
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "Invalid method name: 'v-1/ok'");
    }
}
