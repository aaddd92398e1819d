use anyhow::{anyhow, Result};

pub type NavigateFn = Box<dyn FnMut(&str)>;

/// Single-slot holder for the shell's "go to path" function.
///
/// The shell installs its router hook once at startup and clears it on
/// teardown; the registry's deferred-navigation drain is the only caller.
/// Navigating with nothing installed is a programming error and fails
/// loudly rather than dropping the user's destination on the floor.
#[derive(Default)]
pub struct NavigationBridge {
    target: Option<NavigateFn>,
}

impl NavigationBridge {
    pub fn install(&mut self, f: Option<NavigateFn>) {
        self.target = f;
    }

    #[allow(dead_code)]
    pub fn is_installed(&self) -> bool {
        self.target.is_some()
    }

    pub fn navigate(&mut self, path: &str) -> Result<()> {
        match self.target.as_mut() {
            Some(go) => {
                go(path);
                Ok(())
            }
            None => Err(anyhow!(
                "navigation to {path:?} requested but no navigate callback is installed"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn navigate_without_callback_errors() {
        let mut b = NavigationBridge::default();
        assert!(!b.is_installed());
        assert!(b.navigate("/streams").is_err());
    }

    #[test]
    fn navigate_invokes_installed_callback() {
        let seen: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let mut b = NavigationBridge::default();
        b.install(Some(Box::new(move |p| sink.borrow_mut().push(p.to_string()))));
        b.navigate("/streams").unwrap();
        assert_eq!(seen.borrow().as_slice(), ["/streams"]);
    }

    #[test]
    fn install_none_clears_the_slot() {
        let mut b = NavigationBridge::default();
        b.install(Some(Box::new(|_| {})));
        b.install(None);
        assert!(!b.is_installed());
        assert!(b.navigate("/settings").is_err());
    }
}
