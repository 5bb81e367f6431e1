//! Maps `(service, procedure, encoding)` to a [`HandlerSpec`].

use indexmap::IndexMap;

use crate::encoding::Encoding;
use crate::error::Error;
use crate::handler::HandlerSpec;
use crate::request::Request;

/// One entry registered with a [`Router`].
#[derive(Clone)]
pub struct Procedure {
    pub service: String,
    pub name: String,
    pub encoding: Encoding,
    pub handler: HandlerSpec,
}

impl Procedure {
    pub fn new(name: impl Into<String>, encoding: Encoding, handler: HandlerSpec) -> Self {
        Procedure {
            service: String::new(),
            name: name.into(),
            encoding,
            handler,
        }
    }

    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }
}

/// A registration key. Empty `service` is resolved to the dispatcher's
/// own service name before being stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    service: String,
    procedure: String,
    encoding: String,
}

/// Read-only view of one registration, used by introspection.
#[derive(Debug, Clone)]
pub struct ProcedureDescriptor {
    pub service: String,
    pub name: String,
    pub encoding: Encoding,
}

#[derive(Default)]
pub struct Router {
    entries: IndexMap<Key, HandlerSpec>,
    descriptors: Vec<(String, String, Encoding)>,
}

impl Router {
    pub fn new() -> Self {
        Router::default()
    }

    /// Register a batch of procedures under `default_service` (used when
    /// a `Procedure`'s own `service` field is empty — typically the
    /// dispatcher's service name). Fails fast on the first conflicting or
    /// malformed entry; registrations already applied from earlier calls
    /// are not rolled back, matching "never silently overwrite" rather
    /// than "all or nothing".
    pub fn register(&mut self, default_service: &str, procedures: Vec<Procedure>) -> crate::Result<()> {
        for proc in procedures {
            if proc.name.is_empty() {
                let err = Error::invalid_argument("procedure name must not be empty");
                tracing::error!(error = %err, "router registration failed");
                return Err(err);
            }
            let service = if proc.service.is_empty() {
                default_service.to_string()
            } else {
                proc.service.clone()
            };
            let key = Key {
                service: service.clone(),
                procedure: proc.name.clone(),
                encoding: proc.encoding.as_str().to_string(),
            };
            if self.entries.contains_key(&key) {
                let err = Error::already_exists(format!(
                    "procedure {}/{} already registered for encoding {}",
                    service, proc.name, proc.encoding
                ));
                tracing::error!(error = %err, "router registration failed");
                return Err(err);
            }
            self.descriptors
                .push((service.clone(), proc.name.clone(), proc.encoding.clone()));
            self.entries.insert(key, proc.handler);
        }
        Ok(())
    }

    /// Resolve the handler for `req`. `Unimplemented` if no procedure
    /// matches on `(service, procedure)`; `InvalidArgument` if a
    /// procedure exists under a different encoding.
    #[tracing::instrument(skip(self, req), fields(service = req.callee(), procedure = req.procedure()))]
    pub fn choose(&self, req: &Request) -> crate::Result<HandlerSpec> {
        let key = Key {
            service: req.callee().to_string(),
            procedure: req.procedure().to_string(),
            encoding: req.encoding().as_str().to_string(),
        };
        if let Some(handler) = self.entries.get(&key) {
            return Ok(handler.clone());
        }

        let other_encoding = self
            .entries
            .keys()
            .find(|k| k.service == key.service && k.procedure == key.procedure);
        if let Some(found) = other_encoding {
            return Err(Error::invalid_argument(format!(
                "expected encoding {}, got {}",
                found.encoding,
                req.encoding()
            )));
        }

        Err(Error::unimplemented(format!(
            "unimplemented procedure {:?} for service {:?}",
            req.procedure(),
            req.callee()
        )))
    }

    pub fn procedures(&self) -> Vec<ProcedureDescriptor> {
        self.descriptors
            .iter()
            .map(|(service, name, encoding)| ProcedureDescriptor {
                service: service.clone(),
                name: name.clone(),
                encoding: encoding.clone(),
            })
            .collect()
    }
}
