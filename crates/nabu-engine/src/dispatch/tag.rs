use std::borrow::Cow;
use std::rc::Rc;

/// Key used to address entries for targeted removal.
///
/// Names are for caller-chosen labels (`"dispatch_delayed_button"`); keys carry
/// object identity (see [`Tag::of`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Name(Cow<'static, str>),
    Key(usize),
}

impl Tag {
    #[inline]
    pub fn name(name: impl Into<Cow<'static, str>>) -> Self {
        Tag::Name(name.into())
    }

    /// Identity tag for the allocation behind `rc`.
    #[inline]
    pub fn of<T: ?Sized>(rc: &Rc<T>) -> Self {
        Tag::Key(Rc::as_ptr(rc).cast::<()>() as usize)
    }
}

impl From<&'static str> for Tag {
    fn from(name: &'static str) -> Self {
        Tag::Name(Cow::Borrowed(name))
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Tag::Name(Cow::Owned(name))
    }
}

impl From<&Tag> for Tag {
    fn from(tag: &Tag) -> Self {
        tag.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_compare_by_value() {
        assert_eq!(Tag::from("a"), Tag::name(String::from("a")));
        assert_ne!(Tag::from("a"), Tag::from("b"));
    }

    #[test]
    fn identity_follows_allocation() {
        let a = Rc::new(1);
        let b = Rc::new(1);
        assert_eq!(Tag::of(&a), Tag::of(&a.clone()));
        assert_ne!(Tag::of(&a), Tag::of(&b));
    }
}
