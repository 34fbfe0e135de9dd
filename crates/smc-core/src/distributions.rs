//! Statically enumerated registry of univariate prior distributions.
//!
//! Every family carries its own parameter struct which is validated at
//! construction; the registry maps a family name to its parameter list and
//! constructor so configuration files can refer to distributions by name.
//! Parameterisations follow the precision/scale conventions of the classic
//! PyMC catalogue: `tau` is a precision, `beta` a scale unless noted.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;

use rand_distr::Distribution as _;
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SmcError};
use crate::rng::RngHandle;
use crate::special::{ln_beta, ln_gamma};

fn invalid(family: &str, message: impl Into<String>) -> SmcError {
    SmcError::Configuration(
        ErrorInfo::new("invalid-distribution", message).with_context("distribution", family),
    )
}

fn positive(family: &str, param: &str, value: f64) -> Result<(), SmcError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(family, format!("parameter `{param}` must be positive and finite"))
            .with_context("value", value.to_string()))
    }
}

fn finite(family: &str, param: &str, value: f64) -> Result<(), SmcError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(family, format!("parameter `{param}` must be finite"))
            .with_context("value", value.to_string()))
    }
}

trait Family: Sized + Into<Distribution> {
    const NAME: &'static str;
    const PARAMS: &'static [&'static str];

    fn from_values(values: &[f64]) -> Result<Self, SmcError>;
}

/// Normal distribution with mean `mu` and precision `tau`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normal {
    /// Mean.
    pub mu: f64,
    /// Precision (inverse variance).
    pub tau: f64,
}

impl Normal {
    /// Creates a validated normal distribution.
    pub fn new(mu: f64, tau: f64) -> Result<Self, SmcError> {
        let dist = Self { mu, tau };
        dist.validate()?;
        Ok(dist)
    }

    fn validate(&self) -> Result<(), SmcError> {
        finite(Self::NAME, "mu", self.mu)?;
        positive(Self::NAME, "tau", self.tau)
    }

    fn log_pdf(&self, x: f64) -> f64 {
        let d = x - self.mu;
        0.5 * (self.tau / (2.0 * PI)).ln() - 0.5 * self.tau * d * d
    }

    fn sample(&self, rng: &mut RngHandle) -> Result<f64, SmcError> {
        let normal = rand_distr::Normal::new(self.mu, self.tau.recip().sqrt())
            .map_err(|err| invalid(Self::NAME, err.to_string()))?;
        Ok(normal.sample(rng))
    }
}

impl Family for Normal {
    const NAME: &'static str = "normal";
    const PARAMS: &'static [&'static str] = &["mu", "tau"];

    fn from_values(values: &[f64]) -> Result<Self, SmcError> {
        Self::new(values[0], values[1])
    }
}

/// Log-normal distribution; `ln(x)` is normal with mean `mu` and precision `tau`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogNormal {
    /// Mean of `ln(x)`.
    pub mu: f64,
    /// Precision of `ln(x)`.
    pub tau: f64,
}

impl LogNormal {
    /// Creates a validated log-normal distribution.
    pub fn new(mu: f64, tau: f64) -> Result<Self, SmcError> {
        let dist = Self { mu, tau };
        dist.validate()?;
        Ok(dist)
    }

    fn validate(&self) -> Result<(), SmcError> {
        finite(Self::NAME, "mu", self.mu)?;
        positive(Self::NAME, "tau", self.tau)
    }

    fn log_pdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return f64::NEG_INFINITY;
        }
        let d = x.ln() - self.mu;
        0.5 * (self.tau / (2.0 * PI)).ln() - x.ln() - 0.5 * self.tau * d * d
    }

    fn sample(&self, rng: &mut RngHandle) -> Result<f64, SmcError> {
        let lognormal = rand_distr::LogNormal::new(self.mu, self.tau.recip().sqrt())
            .map_err(|err| invalid(Self::NAME, err.to_string()))?;
        Ok(lognormal.sample(rng))
    }
}

impl Family for LogNormal {
    const NAME: &'static str = "lognormal";
    const PARAMS: &'static [&'static str] = &["mu", "tau"];

    fn from_values(values: &[f64]) -> Result<Self, SmcError> {
        Self::new(values[0], values[1])
    }
}

/// Half-normal distribution on `[0, inf)` with precision `tau`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HalfNormal {
    /// Precision of the underlying zero-mean normal.
    pub tau: f64,
}

impl HalfNormal {
    /// Creates a validated half-normal distribution.
    pub fn new(tau: f64) -> Result<Self, SmcError> {
        let dist = Self { tau };
        dist.validate()?;
        Ok(dist)
    }

    fn validate(&self) -> Result<(), SmcError> {
        positive(Self::NAME, "tau", self.tau)
    }

    fn log_pdf(&self, x: f64) -> f64 {
        if x < 0.0 {
            return f64::NEG_INFINITY;
        }
        0.5 * (2.0 * self.tau / PI).ln() - 0.5 * self.tau * x * x
    }

    fn sample(&self, rng: &mut RngHandle) -> Result<f64, SmcError> {
        Ok((rng.standard_normal() * self.tau.recip().sqrt()).abs())
    }
}

impl Family for HalfNormal {
    const NAME: &'static str = "half_normal";
    const PARAMS: &'static [&'static str] = &["tau"];

    fn from_values(values: &[f64]) -> Result<Self, SmcError> {
        Self::new(values[0])
    }
}

/// Continuous uniform distribution on `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Uniform {
    /// Lower bound.
    pub lower: f64,
    /// Upper bound, strictly greater than `lower`.
    pub upper: f64,
}

impl Uniform {
    /// Creates a validated uniform distribution.
    pub fn new(lower: f64, upper: f64) -> Result<Self, SmcError> {
        let dist = Self { lower, upper };
        dist.validate()?;
        Ok(dist)
    }

    fn validate(&self) -> Result<(), SmcError> {
        finite(Self::NAME, "lower", self.lower)?;
        finite(Self::NAME, "upper", self.upper)?;
        if self.upper <= self.lower {
            return Err(invalid(Self::NAME, "`upper` must exceed `lower`")
                .with_context("lower", self.lower.to_string())
                .with_context("upper", self.upper.to_string()));
        }
        Ok(())
    }

    fn log_pdf(&self, x: f64) -> f64 {
        if x < self.lower || x > self.upper {
            f64::NEG_INFINITY
        } else {
            -(self.upper - self.lower).ln()
        }
    }

    fn sample(&self, rng: &mut RngHandle) -> Result<f64, SmcError> {
        Ok(self.lower + (self.upper - self.lower) * rng.uniform())
    }
}

impl Family for Uniform {
    const NAME: &'static str = "uniform";
    const PARAMS: &'static [&'static str] = &["lower", "upper"];

    fn from_values(values: &[f64]) -> Result<Self, SmcError> {
        Self::new(values[0], values[1])
    }
}

/// Exponential distribution with mean (survival parameter) `beta`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Exponential {
    /// Mean of the distribution.
    pub beta: f64,
}

impl Exponential {
    /// Creates a validated exponential distribution.
    pub fn new(beta: f64) -> Result<Self, SmcError> {
        let dist = Self { beta };
        dist.validate()?;
        Ok(dist)
    }

    fn validate(&self) -> Result<(), SmcError> {
        positive(Self::NAME, "beta", self.beta)
    }

    fn log_pdf(&self, x: f64) -> f64 {
        if x < 0.0 {
            return f64::NEG_INFINITY;
        }
        -self.beta.ln() - x / self.beta
    }

    fn sample(&self, rng: &mut RngHandle) -> Result<f64, SmcError> {
        let exp = rand_distr::Exp::new(self.beta.recip())
            .map_err(|err| invalid(Self::NAME, err.to_string()))?;
        Ok(exp.sample(rng))
    }
}

impl Family for Exponential {
    const NAME: &'static str = "exponential";
    const PARAMS: &'static [&'static str] = &["beta"];

    fn from_values(values: &[f64]) -> Result<Self, SmcError> {
        Self::new(values[0])
    }
}

/// Gamma distribution with shape `alpha` and scale `beta`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gamma {
    /// Shape parameter.
    pub alpha: f64,
    /// Scale parameter.
    pub beta: f64,
}

impl Gamma {
    /// Creates a validated gamma distribution.
    pub fn new(alpha: f64, beta: f64) -> Result<Self, SmcError> {
        let dist = Self { alpha, beta };
        dist.validate()?;
        Ok(dist)
    }

    fn validate(&self) -> Result<(), SmcError> {
        positive(Self::NAME, "alpha", self.alpha)?;
        positive(Self::NAME, "beta", self.beta)
    }

    fn log_pdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return f64::NEG_INFINITY;
        }
        (self.alpha - 1.0) * x.ln() - x / self.beta - ln_gamma(self.alpha) - self.alpha * self.beta.ln()
    }

    fn sample(&self, rng: &mut RngHandle) -> Result<f64, SmcError> {
        let gamma = rand_distr::Gamma::new(self.alpha, self.beta)
            .map_err(|err| invalid(Self::NAME, err.to_string()))?;
        Ok(gamma.sample(rng))
    }
}

impl Family for Gamma {
    const NAME: &'static str = "gamma";
    const PARAMS: &'static [&'static str] = &["alpha", "beta"];

    fn from_values(values: &[f64]) -> Result<Self, SmcError> {
        Self::new(values[0], values[1])
    }
}

/// Beta distribution on `(0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beta {
    /// First shape parameter.
    pub alpha: f64,
    /// Second shape parameter.
    pub beta: f64,
}

impl Beta {
    /// Creates a validated beta distribution.
    pub fn new(alpha: f64, beta: f64) -> Result<Self, SmcError> {
        let dist = Self { alpha, beta };
        dist.validate()?;
        Ok(dist)
    }

    fn validate(&self) -> Result<(), SmcError> {
        positive(Self::NAME, "alpha", self.alpha)?;
        positive(Self::NAME, "beta", self.beta)
    }

    fn log_pdf(&self, x: f64) -> f64 {
        if x <= 0.0 || x >= 1.0 {
            return f64::NEG_INFINITY;
        }
        (self.alpha - 1.0) * x.ln() + (self.beta - 1.0) * (1.0 - x).ln()
            - ln_beta(self.alpha, self.beta)
    }

    fn sample(&self, rng: &mut RngHandle) -> Result<f64, SmcError> {
        let beta = rand_distr::Beta::new(self.alpha, self.beta)
            .map_err(|err| invalid(Self::NAME, err.to_string()))?;
        Ok(beta.sample(rng))
    }
}

impl Family for Beta {
    const NAME: &'static str = "beta";
    const PARAMS: &'static [&'static str] = &["alpha", "beta"];

    fn from_values(values: &[f64]) -> Result<Self, SmcError> {
        Self::new(values[0], values[1])
    }
}

/// Cauchy distribution with location `alpha` and scale `beta`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cauchy {
    /// Location parameter.
    pub alpha: f64,
    /// Scale parameter.
    pub beta: f64,
}

impl Cauchy {
    /// Creates a validated Cauchy distribution.
    pub fn new(alpha: f64, beta: f64) -> Result<Self, SmcError> {
        let dist = Self { alpha, beta };
        dist.validate()?;
        Ok(dist)
    }

    fn validate(&self) -> Result<(), SmcError> {
        finite(Self::NAME, "alpha", self.alpha)?;
        positive(Self::NAME, "beta", self.beta)
    }

    fn log_pdf(&self, x: f64) -> f64 {
        let z = (x - self.alpha) / self.beta;
        -(PI * self.beta).ln() - (1.0 + z * z).ln()
    }

    fn sample(&self, rng: &mut RngHandle) -> Result<f64, SmcError> {
        let cauchy = rand_distr::Cauchy::new(self.alpha, self.beta)
            .map_err(|err| invalid(Self::NAME, err.to_string()))?;
        Ok(cauchy.sample(rng))
    }
}

impl Family for Cauchy {
    const NAME: &'static str = "cauchy";
    const PARAMS: &'static [&'static str] = &["alpha", "beta"];

    fn from_values(values: &[f64]) -> Result<Self, SmcError> {
        Self::new(values[0], values[1])
    }
}

/// Inverse-gamma distribution with shape `alpha` and scale `beta`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InverseGamma {
    /// Shape parameter.
    pub alpha: f64,
    /// Scale parameter.
    pub beta: f64,
}

impl InverseGamma {
    /// Creates a validated inverse-gamma distribution.
    pub fn new(alpha: f64, beta: f64) -> Result<Self, SmcError> {
        let dist = Self { alpha, beta };
        dist.validate()?;
        Ok(dist)
    }

    fn validate(&self) -> Result<(), SmcError> {
        positive(Self::NAME, "alpha", self.alpha)?;
        positive(Self::NAME, "beta", self.beta)
    }

    fn log_pdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return f64::NEG_INFINITY;
        }
        self.alpha * self.beta.ln() - ln_gamma(self.alpha) - (self.alpha + 1.0) * x.ln()
            - self.beta / x
    }

    fn sample(&self, rng: &mut RngHandle) -> Result<f64, SmcError> {
        let gamma = rand_distr::Gamma::new(self.alpha, self.beta.recip())
            .map_err(|err| invalid(Self::NAME, err.to_string()))?;
        Ok(gamma.sample(rng).recip())
    }
}

impl Family for InverseGamma {
    const NAME: &'static str = "inverse_gamma";
    const PARAMS: &'static [&'static str] = &["alpha", "beta"];

    fn from_values(values: &[f64]) -> Result<Self, SmcError> {
        Self::new(values[0], values[1])
    }
}

/// Weibull distribution with shape `alpha` and scale `beta`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weibull {
    /// Shape parameter.
    pub alpha: f64,
    /// Scale parameter.
    pub beta: f64,
}

impl Weibull {
    /// Creates a validated Weibull distribution.
    pub fn new(alpha: f64, beta: f64) -> Result<Self, SmcError> {
        let dist = Self { alpha, beta };
        dist.validate()?;
        Ok(dist)
    }

    fn validate(&self) -> Result<(), SmcError> {
        positive(Self::NAME, "alpha", self.alpha)?;
        positive(Self::NAME, "beta", self.beta)
    }

    fn log_pdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return f64::NEG_INFINITY;
        }
        let z = x / self.beta;
        self.alpha.ln() - self.beta.ln() + (self.alpha - 1.0) * z.ln() - z.powf(self.alpha)
    }

    fn sample(&self, rng: &mut RngHandle) -> Result<f64, SmcError> {
        let weibull = rand_distr::Weibull::new(self.beta, self.alpha)
            .map_err(|err| invalid(Self::NAME, err.to_string()))?;
        Ok(weibull.sample(rng))
    }
}

impl Family for Weibull {
    const NAME: &'static str = "weibull";
    const PARAMS: &'static [&'static str] = &["alpha", "beta"];

    fn from_values(values: &[f64]) -> Result<Self, SmcError> {
        Self::new(values[0], values[1])
    }
}

/// Univariate distribution drawn from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dist", rename_all = "snake_case")]
pub enum Distribution {
    /// See [`Normal`].
    Normal(Normal),
    /// See [`LogNormal`].
    #[serde(rename = "lognormal")]
    LogNormal(LogNormal),
    /// See [`HalfNormal`].
    HalfNormal(HalfNormal),
    /// See [`Uniform`].
    Uniform(Uniform),
    /// See [`Exponential`].
    Exponential(Exponential),
    /// See [`Gamma`].
    Gamma(Gamma),
    /// See [`Beta`].
    Beta(Beta),
    /// See [`Cauchy`].
    Cauchy(Cauchy),
    /// See [`InverseGamma`].
    InverseGamma(InverseGamma),
    /// See [`Weibull`].
    Weibull(Weibull),
}

macro_rules! impl_from_family {
    ($($variant:ident),*) => {
        $(impl From<$variant> for Distribution {
            fn from(dist: $variant) -> Self {
                Distribution::$variant(dist)
            }
        })*
    };
}

impl_from_family!(
    Normal,
    LogNormal,
    HalfNormal,
    Uniform,
    Exponential,
    Gamma,
    Beta,
    Cauchy,
    InverseGamma,
    Weibull
);

macro_rules! dispatch {
    ($self:ident, $dist:ident => $body:expr) => {
        match $self {
            Distribution::Normal($dist) => $body,
            Distribution::LogNormal($dist) => $body,
            Distribution::HalfNormal($dist) => $body,
            Distribution::Uniform($dist) => $body,
            Distribution::Exponential($dist) => $body,
            Distribution::Gamma($dist) => $body,
            Distribution::Beta($dist) => $body,
            Distribution::Cauchy($dist) => $body,
            Distribution::InverseGamma($dist) => $body,
            Distribution::Weibull($dist) => $body,
        }
    };
}

impl Distribution {
    /// Registry name of the family.
    pub fn name(&self) -> &'static str {
        match self {
            Distribution::Normal(_) => Normal::NAME,
            Distribution::LogNormal(_) => LogNormal::NAME,
            Distribution::HalfNormal(_) => HalfNormal::NAME,
            Distribution::Uniform(_) => Uniform::NAME,
            Distribution::Exponential(_) => Exponential::NAME,
            Distribution::Gamma(_) => Gamma::NAME,
            Distribution::Beta(_) => Beta::NAME,
            Distribution::Cauchy(_) => Cauchy::NAME,
            Distribution::InverseGamma(_) => InverseGamma::NAME,
            Distribution::Weibull(_) => Weibull::NAME,
        }
    }

    /// Re-validates the parameters, e.g. after deserialization.
    pub fn validate(&self) -> Result<(), SmcError> {
        dispatch!(self, dist => dist.validate())
    }

    /// Log density at `x`; `-inf` outside the support.
    pub fn log_pdf(&self, x: f64) -> f64 {
        if !x.is_finite() {
            return f64::NEG_INFINITY;
        }
        dispatch!(self, dist => dist.log_pdf(x))
    }

    /// Draws one variate.
    pub fn sample(&self, rng: &mut RngHandle) -> Result<f64, SmcError> {
        dispatch!(self, dist => dist.sample(rng))
    }

    /// Expected value, when it exists.
    pub fn expval(&self) -> Option<f64> {
        match self {
            Distribution::Normal(d) => Some(d.mu),
            Distribution::LogNormal(d) => Some((d.mu + 0.5 / d.tau).exp()),
            Distribution::HalfNormal(d) => Some((2.0 / (PI * d.tau)).sqrt()),
            Distribution::Uniform(d) => Some(0.5 * (d.lower + d.upper)),
            Distribution::Exponential(d) => Some(d.beta),
            Distribution::Gamma(d) => Some(d.alpha * d.beta),
            Distribution::Beta(d) => Some(d.alpha / (d.alpha + d.beta)),
            Distribution::Cauchy(_) => None,
            Distribution::InverseGamma(d) => (d.alpha > 1.0).then(|| d.beta / (d.alpha - 1.0)),
            Distribution::Weibull(d) => Some(d.beta * ln_gamma(1.0 + d.alpha.recip()).exp()),
        }
    }

    /// Builds a distribution from its registry name and named parameters.
    pub fn from_named_params(name: &str, params: &BTreeMap<String, f64>) -> Result<Self, SmcError> {
        let entry = lookup(name).ok_or_else(|| {
            SmcError::Configuration(
                ErrorInfo::new("unknown-distribution", "no distribution registered under this name")
                    .with_context("distribution", name)
                    .with_hint(format!("registered: {}", names().join(", "))),
            )
        })?;
        let mut values = Vec::with_capacity(entry.params.len());
        for param in entry.params {
            let value = params.get(*param).copied().ok_or_else(|| {
                invalid(entry.name, format!("missing parameter `{param}`"))
            })?;
            values.push(value);
        }
        if let Some(extra) = params.keys().find(|key| !entry.params.contains(&key.as_str())) {
            return Err(invalid(entry.name, format!("unexpected parameter `{extra}`")));
        }
        entry.build(&values)
    }
}

/// Registry entry mapping a family name to its parameters and constructor.
#[derive(Clone, Copy)]
pub struct RegistryEntry {
    /// Family name used in configuration files.
    pub name: &'static str,
    /// Ordered parameter names accepted by the constructor.
    pub params: &'static [&'static str],
    constructor: fn(&[f64]) -> Result<Distribution, SmcError>,
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

impl RegistryEntry {
    /// Builds the distribution from positional parameter values.
    pub fn build(&self, values: &[f64]) -> Result<Distribution, SmcError> {
        if values.len() != self.params.len() {
            return Err(invalid(self.name, "wrong number of parameters")
                .with_context("expected", self.params.len().to_string())
                .with_context("actual", values.len().to_string()));
        }
        (self.constructor)(values)
    }
}

fn construct<F: Family>(values: &[f64]) -> Result<Distribution, SmcError> {
    F::from_values(values).map(Into::into)
}

const fn entry<F: Family>() -> RegistryEntry {
    RegistryEntry {
        name: F::NAME,
        params: F::PARAMS,
        constructor: construct::<F>,
    }
}

/// All registered families, in registry order.
pub static REGISTRY: [RegistryEntry; 10] = [
    entry::<Normal>(),
    entry::<LogNormal>(),
    entry::<HalfNormal>(),
    entry::<Uniform>(),
    entry::<Exponential>(),
    entry::<Gamma>(),
    entry::<Beta>(),
    entry::<Cauchy>(),
    entry::<InverseGamma>(),
    entry::<Weibull>(),
];

/// Looks up a family by name.
pub fn lookup(name: &str) -> Option<&'static RegistryEntry> {
    REGISTRY.iter().find(|entry| entry.name == name)
}

/// Names of all registered families.
pub fn names() -> Vec<&'static str> {
    REGISTRY.iter().map(|entry| entry.name).collect()
}
