//! # Envelope Schema Wrapping
//!
//! Documentation-time synthesis of response schemas that mirror the runtime
//! envelope exactly: every documented response body is an object with
//! `status`, `status_code`, `message`, and `data`, matching what the
//! renderer emits. That structural consistency is this module's correctness
//! property, not a convenience.
//!
//! Shape-specs are data, not types: [`ShapeSpec`] describes what `data`
//! looks like for one response, and the builder resolves it recursively
//! into utoipa schema objects plus the component registrations they
//! require. Malformed declarations surface as [`SchemaBuildError`] when the
//! document is assembled at startup — never at request time.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use thiserror::Error;
use utoipa::openapi::path::PathItemType;
use utoipa::openapi::request_body::{RequestBody, RequestBodyBuilder};
use utoipa::openapi::response::{Response, ResponseBuilder};
use utoipa::openapi::schema::{ArrayBuilder, ObjectBuilder, Schema, SchemaType};
use utoipa::openapi::{ContentBuilder, Ref, RefOr, Required};
use utoipa::ToSchema;

use confab_core::envelope::Status;

/// Resolution depth limit for [`ShapeSpec::Callable`] chains.
const MAX_CALLABLE_DEPTH: usize = 8;

// ── Shape specs ─────────────────────────────────────────────────────

/// A schema carried together with the component name it registers under.
#[derive(Debug, Clone)]
pub struct NamedSchema {
    /// Component reference name.
    pub name: String,
    /// The schema registered under that name.
    pub schema: RefOr<Schema>,
}

impl NamedSchema {
    /// Capture a `ToSchema` type as a named schema.
    pub fn of<'s, T: ToSchema<'s>>() -> Self {
        let (name, schema) = T::schema();
        Self {
            name: name.to_string(),
            schema,
        }
    }
}

/// Polymorphic description of a response's `data` field.
#[derive(Debug, Clone)]
pub enum ShapeSpec {
    /// Named composite of sub-shape-specs, rendered as one object schema
    /// registered under `<ref_base>Nested`.
    Composite(Vec<(String, ShapeSpec)>),
    /// One structured type.
    Single(NamedSchema),
    /// An array of one structured type.
    List(NamedSchema),
    /// A shape-producing function, resolved recursively.
    Callable(fn() -> ShapeSpec),
    /// A raw example value. Only the example is precise — the schema is
    /// intentionally a generic object.
    Raw(Value),
    /// No payload: empty object schema.
    Empty,
}

impl ShapeSpec {
    /// Shape for one structured type.
    pub fn single<'s, T: ToSchema<'s>>() -> Self {
        Self::Single(NamedSchema::of::<T>())
    }

    /// Shape for an array of one structured type.
    pub fn list<'s, T: ToSchema<'s>>() -> Self {
        Self::List(NamedSchema::of::<T>())
    }
}

/// Documentation-build failures. These abort startup — schemas are built
/// once, so a malformed declaration must never surface at request time.
#[derive(Debug, Error)]
pub enum SchemaBuildError {
    /// A composite field was declared with an empty name.
    #[error("composite field in '{0}' has an empty name")]
    EmptyFieldName(String),
    /// Two registrations would overwrite each other with different content.
    #[error("conflicting component registration for '{0}'")]
    ConflictingComponent(String),
    /// A callable shape-spec kept returning callables.
    #[error("callable shape-spec for '{0}' exceeded the resolution depth limit")]
    CallableDepth(String),
    /// A wrap declaration named a path/method the document does not contain.
    #[error("no documented operation at {method} {path}")]
    UnknownOperation {
        /// HTTP method of the missing operation.
        method: String,
        /// Path of the missing operation.
        path: String,
    },
}

// ── Component registry ──────────────────────────────────────────────

/// Component registrations accumulated while resolving shapes.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: Vec<(String, RefOr<Schema>)>,
}

impl SchemaRegistry {
    /// Register a schema under a component name. Identical re-registration
    /// is a no-op; a conflicting one fails the build.
    fn register(&mut self, name: &str, schema: RefOr<Schema>) -> Result<(), SchemaBuildError> {
        if let Some((_, existing)) = self.schemas.iter().find(|(n, _)| n == name) {
            let identical =
                serde_json::to_value(existing).ok() == serde_json::to_value(&schema).ok();
            if identical {
                return Ok(());
            }
            return Err(SchemaBuildError::ConflictingComponent(name.to_string()));
        }
        self.schemas.push((name.to_string(), schema));
        Ok(())
    }

    /// Whether a component with this name has been registered.
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.iter().any(|(n, _)| n == name)
    }

    /// Look up a registered schema by component name.
    pub fn get(&self, name: &str) -> Option<&RefOr<Schema>> {
        self.schemas
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, schema)| schema)
    }

    /// Consume the registry, yielding `(name, schema)` pairs.
    pub fn into_schemas(self) -> Vec<(String, RefOr<Schema>)> {
        self.schemas
    }
}

// ── Shape resolution ────────────────────────────────────────────────

/// Resolve a shape-spec into the schema for the envelope's `data` property
/// plus the example value `data` takes in the wrapper example.
fn resolve_data(
    spec: &ShapeSpec,
    ref_base: &str,
    registry: &mut SchemaRegistry,
    depth: usize,
) -> Result<(RefOr<Schema>, Value), SchemaBuildError> {
    match spec {
        ShapeSpec::Composite(fields) => {
            let mut object = ObjectBuilder::new().schema_type(SchemaType::Object);
            for (field_name, field_spec) in fields {
                if field_name.is_empty() {
                    return Err(SchemaBuildError::EmptyFieldName(ref_base.to_string()));
                }
                let (field_schema, _) = resolve_data(field_spec, ref_base, registry, depth)?;
                object = object.property(field_name, field_schema).required(field_name);
            }
            let nested_name = format!("{ref_base}Nested");
            registry.register(&nested_name, RefOr::T(Schema::Object(object.build())))?;
            Ok((
                RefOr::Ref(Ref::from_schema_name(&nested_name)),
                json!({}),
            ))
        }
        ShapeSpec::Single(named) => {
            registry.register(&named.name, named.schema.clone())?;
            Ok((RefOr::Ref(Ref::from_schema_name(&named.name)), json!({})))
        }
        ShapeSpec::List(named) => {
            registry.register(&named.name, named.schema.clone())?;
            let array = ArrayBuilder::new()
                .items(RefOr::Ref(Ref::from_schema_name(&named.name)))
                .build();
            Ok((RefOr::T(Schema::Array(array)), json!([])))
        }
        ShapeSpec::Callable(producer) => {
            if depth >= MAX_CALLABLE_DEPTH {
                return Err(SchemaBuildError::CallableDepth(ref_base.to_string()));
            }
            resolve_data(&producer(), ref_base, registry, depth + 1)
        }
        ShapeSpec::Raw(example) => {
            let object = ObjectBuilder::new()
                .schema_type(SchemaType::Object)
                .example(Some(example.clone()))
                .build();
            Ok((RefOr::T(Schema::Object(object)), example.clone()))
        }
        ShapeSpec::Empty => {
            let object = ObjectBuilder::new().schema_type(SchemaType::Object).build();
            Ok((RefOr::T(Schema::Object(object)), json!({})))
        }
    }
}

/// Synthesize the wrapper schema mirroring the runtime envelope for one
/// status code, registering it — and everything it needs — in `registry`.
/// Returns a reference to the registered wrapper.
pub fn wrap_schema(
    spec: &ShapeSpec,
    ref_base: &str,
    status_code: u16,
    message_example: &str,
    registry: &mut SchemaRegistry,
) -> Result<RefOr<Schema>, SchemaBuildError> {
    let status_example = Status::from_code(status_code).as_str();
    let (data_schema, data_example) = resolve_data(spec, ref_base, registry, 0)?;

    let wrapper = ObjectBuilder::new()
        .schema_type(SchemaType::Object)
        .property(
            "status",
            RefOr::T(Schema::Object(
                ObjectBuilder::new()
                    .schema_type(SchemaType::String)
                    .enum_values(Some(["Success", "Error"]))
                    .default(Some(json!(status_example)))
                    .build(),
            )),
        )
        .required("status")
        .property(
            "status_code",
            RefOr::T(Schema::Object(
                ObjectBuilder::new()
                    .schema_type(SchemaType::Integer)
                    .default(Some(json!(status_code)))
                    .build(),
            )),
        )
        .required("status_code")
        .property(
            "message",
            RefOr::T(Schema::Object(
                ObjectBuilder::new()
                    .schema_type(SchemaType::String)
                    .default(Some(json!(message_example)))
                    .build(),
            )),
        )
        .required("message")
        .property("data", data_schema)
        .required("data")
        .example(Some(json!({
            "status": status_example,
            "status_code": status_code,
            "message": message_example,
            "data": data_example,
        })))
        .build();

    let wrapper_name = format!("{ref_base}{status_code}Response");
    registry.register(&wrapper_name, RefOr::T(Schema::Object(wrapper)))?;
    Ok(RefOr::Ref(Ref::from_schema_name(&wrapper_name)))
}

// ── Operation wrapping ──────────────────────────────────────────────

/// Per-status-code override for one operation's documented responses.
#[derive(Debug, Clone)]
pub struct ResponseOverride {
    /// Human description shown in the documentation.
    pub description: String,
    /// Example message. `None` defaults to "Success" below 400 and "Error"
    /// at 400 and above.
    pub message: Option<String>,
    /// Shape of `data` for this status.
    pub shape: ShapeSpec,
}

impl ResponseOverride {
    /// Override with a description and the empty shape.
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            message: None,
            shape: ShapeSpec::Empty,
        }
    }

    /// Set the example message.
    pub fn message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    /// Set the data shape.
    pub fn shape(mut self, shape: ShapeSpec) -> Self {
        self.shape = shape;
        self
    }
}

/// Envelope-wrap declaration for one documented operation.
#[derive(Debug)]
pub struct OperationWrap {
    /// Route path as it appears in the OpenAPI paths map.
    pub path: String,
    /// HTTP method of the operation.
    pub method: PathItemType,
    /// Reference base for component names, e.g. `"RegisterUser"`.
    pub ref_base: String,
    /// Default 200 data shape, used when no explicit 200 override exists.
    pub output: Option<ShapeSpec>,
    /// Request-body schema; attached only for verbs that carry a body.
    pub input: Option<NamedSchema>,
    /// Explicit per-status overrides.
    pub overrides: BTreeMap<u16, ResponseOverride>,
    /// Auto-register the 403 "Forbidden" response unless suppressed.
    pub include_forbidden: bool,
}

impl OperationWrap {
    /// New wrap declaration for one path/method pair.
    pub fn new(path: &str, method: PathItemType, ref_base: &str) -> Self {
        Self {
            path: path.to_string(),
            method,
            ref_base: ref_base.to_string(),
            output: None,
            input: None,
            overrides: BTreeMap::new(),
            include_forbidden: true,
        }
    }

    /// Set the default 200 data shape.
    pub fn output(mut self, shape: ShapeSpec) -> Self {
        self.output = Some(shape);
        self
    }

    /// Set the request-body schema.
    pub fn input(mut self, named: NamedSchema) -> Self {
        self.input = Some(named);
        self
    }

    /// Add an explicit per-status override.
    pub fn override_status(mut self, code: u16, spec: ResponseOverride) -> Self {
        self.overrides.insert(code, spec);
        self
    }

    /// Suppress the automatic 403 response.
    pub fn without_forbidden(mut self) -> Self {
        self.include_forbidden = false;
        self
    }
}

/// Synthesized schemas for one operation.
#[derive(Debug)]
pub struct OperationSchemas {
    /// Status code → wrapped response.
    pub responses: BTreeMap<u16, Response>,
    /// Request body, when the verb carries one.
    pub request_body: Option<RequestBody>,
}

/// Whether the verb semantically carries a request body.
fn verb_carries_body(method: &PathItemType) -> bool {
    matches!(
        method,
        PathItemType::Post | PathItemType::Put | PathItemType::Patch | PathItemType::Delete
    )
}

fn wrapped_response(description: &str, schema: RefOr<Schema>) -> Response {
    ResponseBuilder::new()
        .description(description)
        .content(
            "application/json",
            ContentBuilder::new().schema(schema).build(),
        )
        .build()
}

/// Build the wrapped response set for one operation declaration.
///
/// Registers a 200 schema from `output` when no explicit 200 override
/// exists, auto-registers 403 "Forbidden" unless suppressed, defaults
/// override messages by status class, and attaches the request body only
/// for body-carrying verbs.
pub fn build_operation(
    wrap: &OperationWrap,
    registry: &mut SchemaRegistry,
) -> Result<OperationSchemas, SchemaBuildError> {
    let mut responses = BTreeMap::new();

    for (code, spec) in &wrap.overrides {
        let message = spec.message.clone().unwrap_or_else(|| {
            if *code < 400 { "Success" } else { "Error" }.to_string()
        });
        let schema = wrap_schema(&spec.shape, &wrap.ref_base, *code, &message, registry)?;
        responses.insert(*code, wrapped_response(&spec.description, schema));
    }

    if let Some(output) = &wrap.output {
        if !responses.contains_key(&200) {
            let schema = wrap_schema(output, &wrap.ref_base, 200, "Success", registry)?;
            responses.insert(200, wrapped_response("Successful response", schema));
        }
    }

    if wrap.include_forbidden && !responses.contains_key(&403) {
        let schema = wrap_schema(&ShapeSpec::Empty, &wrap.ref_base, 403, "Forbidden", registry)?;
        responses.insert(403, wrapped_response("Forbidden", schema));
    }

    let request_body = match (&wrap.input, verb_carries_body(&wrap.method)) {
        (Some(input), true) => {
            registry.register(&input.name, input.schema.clone())?;
            Some(
                RequestBodyBuilder::new()
                    .content(
                        "application/json",
                        ContentBuilder::new()
                            .schema(RefOr::Ref(Ref::from_schema_name(&input.name)))
                            .build(),
                    )
                    .required(Some(Required::True))
                    .build(),
            )
        }
        _ => None,
    };

    Ok(OperationSchemas {
        responses,
        request_body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use utoipa::ToSchema;

    use confab_core::envelope::{encode, Envelope};

    #[derive(Serialize, ToSchema)]
    struct ProbeOut {
        id: u32,
        name: String,
    }

    #[derive(Serialize, ToSchema)]
    struct OtherOut {
        flag: bool,
    }

    fn wrap(path: &str, ref_base: &str) -> OperationWrap {
        OperationWrap::new(path, PathItemType::Get, ref_base)
    }

    fn schema_value(registry: &SchemaRegistry, name: &str) -> Value {
        let schema = registry
            .get(name)
            .unwrap_or_else(|| panic!("schema {name} registered"));
        serde_json::to_value(schema).expect("schema serializes")
    }

    // ── wrap_schema ──────────────────────────────────────────────

    #[test]
    fn wrapper_mirrors_envelope_field_set() {
        let mut registry = SchemaRegistry::default();
        wrap_schema(&ShapeSpec::Empty, "Probe", 200, "Success", &mut registry)
            .expect("wrap builds");
        let wrapper = schema_value(&registry, "Probe200Response");

        let mut schema_keys: Vec<String> = wrapper["properties"]
            .as_object()
            .expect("properties")
            .keys()
            .cloned()
            .collect();
        schema_keys.sort();

        let envelope: Envelope = encode(200, json!({}));
        let mut envelope_keys: Vec<String> = serde_json::to_value(&envelope)
            .expect("envelope serializes")
            .as_object()
            .expect("object")
            .keys()
            .cloned()
            .collect();
        envelope_keys.sort();

        assert_eq!(schema_keys, envelope_keys);
    }

    #[test]
    fn wrapper_example_matches_status_class() {
        let mut registry = SchemaRegistry::default();
        wrap_schema(&ShapeSpec::Empty, "Probe", 403, "Forbidden", &mut registry)
            .expect("wrap builds");
        let wrapper = schema_value(&registry, "Probe403Response");
        assert_eq!(wrapper["example"]["status"], "Error");
        assert_eq!(wrapper["example"]["status_code"], 403);
        assert_eq!(wrapper["example"]["message"], "Forbidden");
        assert_eq!(wrapper["example"]["data"], json!({}));
    }

    #[test]
    fn single_shape_registers_and_references_the_type() {
        let mut registry = SchemaRegistry::default();
        wrap_schema(
            &ShapeSpec::single::<ProbeOut>(),
            "Probe",
            200,
            "Success",
            &mut registry,
        )
        .expect("wrap builds");
        assert!(registry.contains("ProbeOut"));
        let wrapper = schema_value(&registry, "Probe200Response");
        assert_eq!(
            wrapper["properties"]["data"]["$ref"],
            "#/components/schemas/ProbeOut"
        );
    }

    #[test]
    fn list_shape_uses_array_items_and_empty_list_example() {
        let mut registry = SchemaRegistry::default();
        wrap_schema(
            &ShapeSpec::list::<ProbeOut>(),
            "Probe",
            200,
            "Success",
            &mut registry,
        )
        .expect("wrap builds");
        let wrapper = schema_value(&registry, "Probe200Response");
        assert_eq!(wrapper["properties"]["data"]["type"], "array");
        assert_eq!(
            wrapper["properties"]["data"]["items"]["$ref"],
            "#/components/schemas/ProbeOut"
        );
        assert_eq!(wrapper["example"]["data"], json!([]));
    }

    #[test]
    fn composite_registers_nested_reference() {
        let mut registry = SchemaRegistry::default();
        let spec = ShapeSpec::Composite(vec![
            ("user".to_string(), ShapeSpec::single::<ProbeOut>()),
            ("other".to_string(), ShapeSpec::single::<OtherOut>()),
        ]);
        wrap_schema(&spec, "WhoAmI", 200, "Success", &mut registry).expect("wrap builds");
        assert!(registry.contains("WhoAmINested"));
        assert!(registry.contains("ProbeOut"));
        assert!(registry.contains("OtherOut"));

        let nested = schema_value(&registry, "WhoAmINested");
        assert_eq!(
            nested["properties"]["user"]["$ref"],
            "#/components/schemas/ProbeOut"
        );
        assert_eq!(
            nested["properties"]["other"]["$ref"],
            "#/components/schemas/OtherOut"
        );
    }

    #[test]
    fn composite_with_empty_field_name_fails_fast() {
        let mut registry = SchemaRegistry::default();
        let spec = ShapeSpec::Composite(vec![(String::new(), ShapeSpec::Empty)]);
        let err = wrap_schema(&spec, "Bad", 200, "Success", &mut registry).unwrap_err();
        assert!(matches!(err, SchemaBuildError::EmptyFieldName(_)));
    }

    #[test]
    fn callable_resolves_to_produced_shape() {
        fn produces() -> ShapeSpec {
            ShapeSpec::single::<ProbeOut>()
        }
        let mut registry = SchemaRegistry::default();
        wrap_schema(
            &ShapeSpec::Callable(produces),
            "Probe",
            200,
            "Success",
            &mut registry,
        )
        .expect("wrap builds");
        assert!(registry.contains("ProbeOut"));
    }

    #[test]
    fn endless_callable_chain_fails_fast() {
        fn loops() -> ShapeSpec {
            ShapeSpec::Callable(loops)
        }
        let mut registry = SchemaRegistry::default();
        let err = wrap_schema(
            &ShapeSpec::Callable(loops),
            "Loop",
            200,
            "Success",
            &mut registry,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaBuildError::CallableDepth(_)));
    }

    #[test]
    fn raw_shape_keeps_example_with_generic_schema() {
        let mut registry = SchemaRegistry::default();
        let example = json!({"user": {"id": 1, "username": "demo"}});
        wrap_schema(
            &ShapeSpec::Raw(example.clone()),
            "Probe",
            200,
            "Success",
            &mut registry,
        )
        .expect("wrap builds");
        let wrapper = schema_value(&registry, "Probe200Response");
        assert_eq!(wrapper["properties"]["data"]["type"], "object");
        assert!(wrapper["properties"]["data"]
            .get("properties")
            .is_none());
        assert_eq!(wrapper["example"]["data"], example);
    }

    #[test]
    fn conflicting_registration_fails_fast() {
        let mut registry = SchemaRegistry::default();
        wrap_schema(&ShapeSpec::Empty, "Same", 200, "Success", &mut registry)
            .expect("first wrap");
        let err = wrap_schema(
            &ShapeSpec::single::<ProbeOut>(),
            "Same",
            200,
            "Success",
            &mut registry,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaBuildError::ConflictingComponent(_)));
    }

    #[test]
    fn identical_reregistration_is_a_no_op() {
        let mut registry = SchemaRegistry::default();
        wrap_schema(
            &ShapeSpec::single::<ProbeOut>(),
            "A",
            200,
            "Success",
            &mut registry,
        )
        .expect("first");
        wrap_schema(
            &ShapeSpec::single::<ProbeOut>(),
            "B",
            200,
            "Success",
            &mut registry,
        )
        .expect("second registers the same ProbeOut");
    }

    // ── build_operation ──────────────────────────────────────────

    #[test]
    fn output_shape_yields_auto_200_and_auto_403() {
        let mut registry = SchemaRegistry::default();
        let built = build_operation(
            &wrap("/probes", "FetchProbes").output(ShapeSpec::list::<ProbeOut>()),
            &mut registry,
        )
        .expect("builds");
        assert!(built.responses.contains_key(&200));
        assert!(built.responses.contains_key(&403));
        assert!(registry.contains("FetchProbes200Response"));
        assert!(registry.contains("FetchProbes403Response"));
    }

    #[test]
    fn explicit_200_override_shadows_output() {
        let mut registry = SchemaRegistry::default();
        let built = build_operation(
            &wrap("/probes", "FetchProbes")
                .output(ShapeSpec::list::<ProbeOut>())
                .override_status(200, ResponseOverride::new("Listed").message("All probes")),
            &mut registry,
        )
        .expect("builds");
        assert_eq!(built.responses.len(), 2); // 200 + 403
        let wrapper = schema_value(&registry, "FetchProbes200Response");
        assert_eq!(wrapper["example"]["message"], "All probes");
    }

    #[test]
    fn forbidden_can_be_suppressed() {
        let mut registry = SchemaRegistry::default();
        let built = build_operation(
            &wrap("/probes", "FetchProbes")
                .output(ShapeSpec::Empty)
                .without_forbidden(),
            &mut registry,
        )
        .expect("builds");
        assert!(!built.responses.contains_key(&403));
    }

    #[test]
    fn explicit_403_override_wins_over_auto_forbidden() {
        let mut registry = SchemaRegistry::default();
        let built = build_operation(
            &wrap("/probes", "FetchProbes")
                .override_status(403, ResponseOverride::new("Denied").message("Not yours")),
            &mut registry,
        )
        .expect("builds");
        assert_eq!(built.responses.len(), 1);
        let wrapper = schema_value(&registry, "FetchProbes403Response");
        assert_eq!(wrapper["example"]["message"], "Not yours");
    }

    #[test]
    fn override_messages_default_by_status_class() {
        let mut registry = SchemaRegistry::default();
        build_operation(
            &wrap("/probes", "Op")
                .override_status(201, ResponseOverride::new("Created"))
                .override_status(404, ResponseOverride::new("Missing")),
            &mut registry,
        )
        .expect("builds");

        let created = schema_value(&registry, "Op201Response");
        assert_eq!(created["example"]["message"], "Success");
        assert_eq!(created["example"]["status"], "Success");

        let missing = schema_value(&registry, "Op404Response");
        assert_eq!(missing["example"]["message"], "Error");
        assert_eq!(missing["example"]["status"], "Error");
    }

    #[test]
    fn request_body_only_for_body_carrying_verbs() {
        let mut registry = SchemaRegistry::default();
        let with_body = build_operation(
            &OperationWrap::new("/probes", PathItemType::Post, "CreateProbe")
                .input(NamedSchema::of::<ProbeOut>()),
            &mut registry,
        )
        .expect("builds");
        assert!(with_body.request_body.is_some());

        let mut registry = SchemaRegistry::default();
        let without_body = build_operation(
            &OperationWrap::new("/probes", PathItemType::Get, "FetchProbe")
                .input(NamedSchema::of::<ProbeOut>()),
            &mut registry,
        )
        .expect("builds");
        assert!(without_body.request_body.is_none());
    }
}
