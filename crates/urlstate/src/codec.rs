use std::fmt::Debug;

/// Text form of one URL-bound value.
///
/// Implementations are pure. `try_hydrate` may reject input; everything that
/// reads the URL goes through [`ParamCodec::hydrate`], which never fails and
/// falls back to [`ParamCodec::initial`].
pub trait ParamCodec {
    type Value: Clone + PartialEq + Debug;

    /// Value used when the parameter is absent or unparseable.
    fn initial(&self) -> Self::Value;

    fn try_hydrate(&self, raw: &str) -> Result<Self::Value, String>;

    /// An empty string means "omit the parameter".
    fn dehydrate(&self, value: &Self::Value) -> String;

    /// Equality used to suppress redundant writes and URL echoes.
    fn are_equal(&self, a: &Self::Value, b: &Self::Value) -> bool {
        a == b
    }

    /// Merges a freshly hydrated URL value into stored state. The default
    /// replaces the stored value outright.
    fn reconcile(&self, from_url: Self::Value, _stored: &Self::Value) -> Self::Value {
        from_url
    }

    fn hydrate(&self, raw: Option<&str>) -> Self::Value {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return self.initial();
        };
        match self.try_hydrate(raw) {
            Ok(value) => value,
            Err(reason) => {
                tracing::debug!(raw, %reason, "unparseable url value, using default");
                self.initial()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ParamCodec;

    struct Percent;

    impl ParamCodec for Percent {
        type Value = u8;

        fn initial(&self) -> u8 {
            100
        }

        fn try_hydrate(&self, raw: &str) -> Result<u8, String> {
            let v: u8 = raw.parse().map_err(|e| format!("{e}"))?;
            if v > 100 {
                return Err(format!("{v} is above 100"));
            }
            Ok(v)
        }

        fn dehydrate(&self, value: &u8) -> String {
            if *value == 100 {
                String::new()
            } else {
                value.to_string()
            }
        }
    }

    #[test]
    fn hydrate_falls_back_on_missing_or_bad_input() {
        assert_eq!(Percent.hydrate(None), 100);
        assert_eq!(Percent.hydrate(Some("")), 100);
        assert_eq!(Percent.hydrate(Some("abc")), 100);
        assert_eq!(Percent.hydrate(Some("250")), 100);
        assert_eq!(Percent.hydrate(Some(" 40 ")), 40);
    }

    #[test]
    fn default_reconcile_prefers_url() {
        assert_eq!(Percent.reconcile(10, &20), 10);
        assert!(Percent.are_equal(&5, &5));
    }
}
