//! Training hyperparameters, built with `derive_builder`. Validation
//! happens in the generated builder's `build()` and again in the mutable
//! setters the trainers expose, so `set_k`/`set_lambda`/`set_iters`/
//! `set_alpha` reject bad values at call time, not just at construction.

use derive_builder::Builder;

use crate::error::{RecomfError, Result};

#[derive(Builder, Debug, Clone, Copy, PartialEq)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct HyperParameters {
    #[builder(default = "10")]
    k: usize,
    #[builder(default = "15")]
    iters: usize,
    #[builder(default = "0.015")]
    lambda: f32,
    #[builder(default = "1.0")]
    alpha: f32,
    #[builder(default = "0.015")]
    lambda_cross: f32,
}

impl HyperParametersBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(k) = self.k {
            if k < 1 {
                return Err("k must be >= 1".to_string());
            }
        }
        if let Some(lambda) = self.lambda {
            if lambda < 0.0 {
                return Err("lambda must be >= 0".to_string());
            }
        }
        if let Some(alpha) = self.alpha {
            if alpha < 0.0 {
                return Err("alpha must be >= 0".to_string());
            }
        }
        if let Some(lambda_cross) = self.lambda_cross {
            if lambda_cross < 0.0 {
                return Err("lambda_cross must be >= 0".to_string());
            }
        }
        Ok(())
    }
}

impl Default for HyperParameters {
    fn default() -> Self {
        HyperParametersBuilder::default().build().unwrap()
    }
}

impl HyperParameters {
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn iters(&self) -> usize {
        self.iters
    }

    pub fn lambda(&self) -> f32 {
        self.lambda
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn lambda_cross(&self) -> f32 {
        self.lambda_cross
    }

    pub fn set_k(&mut self, k: usize) -> Result<()> {
        if k < 1 {
            return Err(RecomfError::config("k must be >= 1"));
        }
        self.k = k;
        Ok(())
    }

    pub fn set_iters(&mut self, iters: usize) -> Result<()> {
        self.iters = iters;
        Ok(())
    }

    pub fn set_lambda(&mut self, lambda: f32) -> Result<()> {
        if lambda < 0.0 {
            return Err(RecomfError::config("lambda must be >= 0"));
        }
        self.lambda = lambda;
        Ok(())
    }

    pub fn set_alpha(&mut self, alpha: f32) -> Result<()> {
        if alpha < 0.0 {
            return Err(RecomfError::config("alpha must be >= 0"));
        }
        self.alpha = alpha;
        Ok(())
    }

    pub fn set_lambda_cross(&mut self, lambda_cross: f32) -> Result<()> {
        if lambda_cross < 0.0 {
            return Err(RecomfError::config("lambda_cross must be >= 0"));
        }
        self.lambda_cross = lambda_cross;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let hyper = HyperParameters::default();
        assert_eq!(hyper.k(), 10);
        assert_eq!(hyper.iters(), 15);
        assert_eq!(hyper.lambda(), 0.015);
        assert_eq!(hyper.alpha(), 1.0);
        assert_eq!(hyper.lambda_cross(), 0.015);
    }

    #[test]
    fn builder_rejects_bad_k() {
        let result = HyperParametersBuilder::default().k(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn setter_rejects_negative_lambda() {
        let mut hyper = HyperParameters::default();
        assert!(hyper.set_lambda(-1.0).is_err());
        assert_eq!(hyper.lambda(), 0.015);
    }

    #[test]
    fn setters_apply_valid_values() {
        let mut hyper = HyperParameters::default();
        hyper.set_k(4).unwrap();
        hyper.set_iters(20).unwrap();
        hyper.set_alpha(2.0).unwrap();
        assert_eq!(hyper.k(), 4);
        assert_eq!(hyper.iters(), 20);
        assert_eq!(hyper.alpha(), 2.0);
    }
}
