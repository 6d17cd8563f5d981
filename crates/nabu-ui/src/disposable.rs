use std::fmt;
use std::rc::Rc;

use nabu_engine::dispatch::{Context, EventHandler};

/// Something an [`AppNode`](crate::app_node::AppNode) can tear down when it is disposed.
pub trait Dispose {
    fn dispose(&self);
}

impl Dispose for Context {
    fn dispose(&self) {
        Context::dispose(self);
    }
}

impl Dispose for EventHandler {
    fn dispose(&self) {
        EventHandler::dispose(self);
    }
}

/// A cleanup step owned by an app node.
pub enum Disposable {
    /// Called once.
    Callback(Box<dyn FnOnce()>),
    Object(Rc<dyn Dispose>),
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposable::Callback(_) => f.write_str("Callback(..)"),
            Disposable::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl Disposable {
    pub fn callback(f: impl FnOnce() + 'static) -> Self {
        Disposable::Callback(Box::new(f))
    }

    pub fn object(object: impl Dispose + 'static) -> Self {
        Disposable::Object(Rc::new(object))
    }

    pub fn dispose(self) {
        match self {
            Disposable::Callback(f) => f(),
            Disposable::Object(object) => object.dispose(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn callback_runs_once_on_dispose() {
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let disposable = Disposable::callback(move || c.set(c.get() + 1));
        assert_eq!(calls.get(), 0);
        disposable.dispose();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn object_disposes_context() {
        let context = Context::new();
        Disposable::object(context.clone()).dispose();
        assert!(context.is_disposed());
    }
}
