//! The persistent namespace executor: the engine's deliberate architectural
//! bet. One process-wide Python namespace is created once and reused for
//! every node invocation, so definitions, imports, and object identity
//! survive across the whole run. See the module doc comment in
//! [`super`] for the tradeoffs this buys and costs.

use std::collections::HashMap;
use std::ffi::CString;
use std::time::{Duration, Instant};

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::core::NodeId;
use crate::error::{PyFlowError, Result};

/// Standard-library modules preloaded into every fresh namespace, matching
/// what example node bodies commonly reach for without an explicit import.
const PRELOADED_MODULES: &[&str] = &["math", "json", "re", "itertools", "collections", "datetime", "random"];

const NODE_ENTRY_SOURCE: &str = "def node_entry(fn):\n    return fn\n";

/// The result of invoking one node's function.
///
/// `return_value` is the live Python object the function returned, not a
/// JSON reconstruction of it: passing it straight into a downstream node's
/// kwargs (rather than round-tripping it through [`py_to_json`]/
/// [`json_to_py`]) is what lets object identity survive a hop between nodes.
#[derive(Clone)]
pub struct NodeInvocation {
    pub return_value: Py<PyAny>,
    pub stdout: String,
    pub duration: Duration,
}

/// Persistent-namespace executor embedding a real CPython interpreter.
///
/// The namespace is rebuilt from scratch only on an explicit [`reset`],
/// never implicitly, so that object identity across node calls is a
/// property callers can rely on within a run.
///
/// [`reset`]: SingleProcessExecutor::reset
pub struct SingleProcessExecutor {
    namespace: Py<PyDict>,
    object_store: HashMap<String, Py<PyAny>>,
    last_durations: HashMap<NodeId, Duration>,
}

impl SingleProcessExecutor {
    pub fn new() -> Result<Self> {
        let namespace = Python::with_gil(|py| -> PyResult<Py<PyDict>> {
            let ns = PyDict::new(py);
            preload(py, &ns)?;
            Ok(ns.unbind())
        })?;
        tracing::info!("persistent namespace created");
        Ok(Self {
            namespace,
            object_store: HashMap::new(),
            last_durations: HashMap::new(),
        })
    }

    /// Rebuild the namespace from scratch, restoring the preloaded set and
    /// dropping the object store. Never triggered implicitly.
    pub fn reset(&mut self) -> Result<()> {
        let namespace = Python::with_gil(|py| -> PyResult<Py<PyDict>> {
            let ns = PyDict::new(py);
            preload(py, &ns)?;
            Ok(ns.unbind())
        })?;
        self.namespace = namespace;
        self.object_store.clear();
        self.last_durations.clear();
        tracing::info!("persistent namespace reset");
        Ok(())
    }

    /// Execute `source` against the persistent namespace (defining or
    /// redefining `function_name` and any helpers), then call
    /// `function_name(**inputs)` and capture its stdout.
    ///
    /// `inputs` are bound into the call's kwargs as-is: a value cloned out of
    /// a previous invocation's `return_value` (or out of the object store)
    /// reaches the callee as the very same Python object, not a copy
    /// reconstructed from JSON.
    pub fn execute(
        &mut self,
        node_id: NodeId,
        source: &str,
        function_name: &str,
        inputs: &HashMap<String, Py<PyAny>>,
    ) -> Result<NodeInvocation> {
        let start = Instant::now();
        let outcome = Python::with_gil(|py| -> PyResult<(Py<PyAny>, String)> {
            let ns = self.namespace.bind(py);

            let code = CString::new(source).map_err(|e| {
                pyo3::exceptions::PySyntaxError::new_err(format!("node source contains a NUL byte: {e}"))
            })?;
            py.run(code.as_c_str(), Some(ns), Some(ns))?;

            let func = ns
                .get_item(function_name)?
                .ok_or_else(|| pyo3::exceptions::PyNameError::new_err(function_name.to_string()))?;

            let kwargs = PyDict::new(py);
            for (name, value) in inputs {
                kwargs.set_item(name, value.bind(py))?;
            }

            let sys = py.import("sys")?;
            let io = py.import("io")?;
            let buffer = io.getattr("StringIO")?.call0()?;
            let original_stdout = sys.getattr("stdout")?;
            sys.setattr("stdout", &buffer)?;

            let call_result = func.call((), Some(&kwargs));

            sys.setattr("stdout", original_stdout)?;
            let captured: String = buffer.call_method0("getvalue")?.extract().unwrap_or_default();

            let value = call_result?;
            Ok((value.unbind(), captured))
        });

        let duration = start.elapsed();
        self.last_durations.insert(node_id, duration);

        match outcome {
            Ok((return_value, stdout)) => Ok(NodeInvocation { return_value, stdout, duration }),
            Err(err) => {
                tracing::error!(node = %node_id, error = %err, "node raised during execution");
                Err(PyFlowError::Execution {
                    node: node_id.to_string(),
                    message: err.to_string(),
                })
            }
        }
    }

    /// Store `value` under `key` in the object store, overwriting any prior
    /// value. Independent of pin flow, for deliberate cross-node caching.
    /// `value` is kept as the live object handed in, not a JSON copy, so a
    /// later [`get_object`](Self::get_object) returns the identical object.
    pub fn store_object(&mut self, key: impl Into<String>, value: Py<PyAny>) {
        self.object_store.insert(key.into(), value);
    }

    /// Retrieve a value previously stored under `key`. `None` distinguishes
    /// "not found" from any value the caller could have stored, including
    /// Python `None`. The returned handle is the same object that was
    /// stored, not a reconstruction.
    pub fn get_object(&self, key: &str) -> Option<Py<PyAny>> {
        self.object_store.get(key).cloned()
    }

    /// Execution time of the most recent invocation of `node_id`, for
    /// per-node diagnostic reporting.
    pub fn last_duration(&self, node_id: NodeId) -> Option<Duration> {
        self.last_durations.get(&node_id).copied()
    }
}

fn preload(py: Python<'_>, ns: &Bound<'_, PyDict>) -> PyResult<()> {
    for module_name in PRELOADED_MODULES {
        if let Ok(module) = py.import(*module_name) {
            ns.set_item(*module_name, module)?;
        }
    }
    let code = CString::new(NODE_ENTRY_SOURCE).expect("static source has no NUL bytes");
    let module_name = CString::new("pyflowgraph_builtins").expect("static name has no NUL bytes");
    let file_name = CString::new("pyflowgraph_builtins.py").expect("static name has no NUL bytes");
    let builtins = PyModule::from_code(py, code.as_c_str(), file_name.as_c_str(), module_name.as_c_str())?;
    ns.set_item("node_entry", builtins.getattr("node_entry")?)?;
    Ok(())
}

/// A fresh handle to the Python `None` singleton, for pins with no upstream
/// connection: there is no prior object to preserve identity of.
pub(crate) fn py_none() -> Py<PyAny> {
    Python::with_gil(|py| py.None())
}

/// Convert a JSON literal (a UI-entered default, not a value produced by
/// another node) into a Python object to seed an unconnected input pin.
pub(crate) fn literal_to_py(value: &serde_json::Value) -> Py<PyAny> {
    Python::with_gil(|py| match json_to_py(py, value) {
        Ok(obj) => obj.unbind(),
        Err(_) => py.None(),
    })
}

/// Convert a live Python object to JSON for a boundary that genuinely needs
/// serialization (the externally-visible run summary, persistence, a widget
/// handler) rather than for handing the value to another node.
pub(crate) fn value_to_json(py: Python<'_>, value: &Py<PyAny>) -> Result<serde_json::Value> {
    Ok(py_to_json(py, value.bind(py))?)
}

pub(crate) fn json_to_py<'py>(py: Python<'py>, value: &serde_json::Value) -> PyResult<Bound<'py, PyAny>> {
    use serde_json::Value as J;
    Ok(match value {
        J::Null => py.None().into_bound(py),
        J::Bool(b) => b.into_pyobject(py)?.to_owned().into_any(),
        J::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into_pyobject(py)?.into_any()
            } else {
                n.as_f64().unwrap_or(0.0).into_pyobject(py)?.into_any()
            }
        }
        J::String(s) => s.into_pyobject(py)?.into_any(),
        J::Array(items) => {
            let list = PyList::empty(py);
            for item in items {
                list.append(json_to_py(py, item)?)?;
            }
            list.into_any()
        }
        J::Object(map) => {
            let dict = PyDict::new(py);
            for (key, item) in map {
                dict.set_item(key, json_to_py(py, item)?)?;
            }
            dict.into_any()
        }
    })
}

pub(crate) fn py_to_json(py: Python<'_>, value: &Bound<'_, PyAny>) -> PyResult<serde_json::Value> {
    if value.is_none() {
        return Ok(serde_json::Value::Null);
    }
    if let Ok(b) = value.extract::<bool>() {
        return Ok(serde_json::Value::Bool(b));
    }
    if let Ok(i) = value.extract::<i64>() {
        return Ok(serde_json::Value::Number(i.into()));
    }
    if let Ok(f) = value.extract::<f64>() {
        return Ok(serde_json::Number::from_f64(f).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null));
    }
    if let Ok(s) = value.extract::<String>() {
        return Ok(serde_json::Value::String(s));
    }
    if let Ok(list) = value.downcast::<PyList>() {
        let mut out = Vec::with_capacity(list.len());
        for item in list.iter() {
            out.push(py_to_json(py, &item)?);
        }
        return Ok(serde_json::Value::Array(out));
    }
    if let Ok(dict) = value.downcast::<PyDict>() {
        let mut map = serde_json::Map::with_capacity(dict.len());
        for (key, item) in dict.iter() {
            let key_str: String = key.str()?.extract()?;
            map.insert(key_str, py_to_json(py, &item)?);
        }
        return Ok(serde_json::Value::Object(map));
    }
    // Fall back to a string representation for anything else the node
    // returns (e.g. a custom class instance), rather than failing the run.
    Ok(serde_json::Value::String(value.str()?.extract()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn executes_function_and_captures_stdout() {
        let mut executor = SingleProcessExecutor::new().unwrap();
        let node_id = uuid::Uuid::new_v4();
        let inputs = HashMap::from([("a".to_string(), literal_to_py(&json!(2))), ("b".to_string(), literal_to_py(&json!(3)))]);
        let result = executor
            .execute(
                node_id,
                "@node_entry\ndef add(a, b):\n    print('adding')\n    return a + b\n",
                "add",
                &inputs,
            )
            .unwrap();
        Python::with_gil(|py| {
            assert_eq!(value_to_json(py, &result.return_value).unwrap(), json!(5));
        });
        assert!(result.stdout.contains("adding"));
    }

    #[test]
    fn namespace_persists_helpers_across_calls() {
        let mut executor = SingleProcessExecutor::new().unwrap();
        let node_id = uuid::Uuid::new_v4();
        executor
            .execute(node_id, "def helper():\n    return 41\n\ndef use_helper():\n    return helper() + 1\n", "use_helper", &HashMap::new())
            .unwrap();
        let result = executor.execute(node_id, "", "use_helper", &HashMap::new());
        // Re-running empty source still resolves `use_helper` from the
        // namespace populated by the previous call.
        assert!(result.is_ok());
    }

    #[test]
    fn object_store_distinguishes_missing_from_null() {
        let mut executor = SingleProcessExecutor::new().unwrap();
        assert!(executor.get_object("missing").is_none());
        executor.store_object("k", py_none());
        let stored = executor.get_object("k").unwrap();
        Python::with_gil(|py| assert!(stored.bind(py).is_none()));
    }

    #[test]
    fn reset_clears_object_store() {
        let mut executor = SingleProcessExecutor::new().unwrap();
        executor.store_object("k", literal_to_py(&json!(1)));
        executor.reset().unwrap();
        assert!(executor.get_object("k").is_none());
    }

    /// Mirrors the ground-truth `test_direct_object_passing`: a mutable
    /// object stored and retrieved comes back as the exact same object, not
    /// an equal-but-distinct copy.
    #[test]
    fn store_object_preserves_identity_of_a_mutable_list() {
        let mut executor = SingleProcessExecutor::new().unwrap();
        Python::with_gil(|py| {
            let list = PyList::new(py, [1, 2, 3]).unwrap().into_any().unbind();
            executor.store_object("shared", list.clone_ref(py));
            let retrieved = executor.get_object("shared").unwrap();
            assert!(retrieved.bind(py).is(list.bind(py)));
        });
    }

    /// A value produced by one node and handed to another arrives as the
    /// same object, not a JSON-reconstructed equal copy.
    #[test]
    fn execute_passes_the_same_object_through_as_an_input() {
        let mut executor = SingleProcessExecutor::new().unwrap();
        let node_id = uuid::Uuid::new_v4();
        let producer = executor
            .execute(node_id, "@node_entry\ndef make():\n    return [1, 2, 3]\n", "make", &HashMap::new())
            .unwrap();

        let inputs = HashMap::from([("items".to_string(), producer.return_value.clone())]);
        let consumer = executor
            .execute(node_id, "@node_entry\ndef identity(items):\n    return items\n", "identity", &inputs)
            .unwrap();

        Python::with_gil(|py| {
            assert!(consumer.return_value.bind(py).is(producer.return_value.bind(py)));
        });
    }

    #[test]
    fn node_failure_reports_node_identity() {
        let mut executor = SingleProcessExecutor::new().unwrap();
        let node_id = uuid::Uuid::new_v4();
        let err = executor
            .execute(node_id, "@node_entry\ndef boom():\n    raise ValueError('no')\n", "boom", &HashMap::new())
            .unwrap_err();
        assert!(err.to_string().contains(&node_id.to_string()));
    }
}
