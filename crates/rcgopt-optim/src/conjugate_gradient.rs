//! Riemannian nonlinear conjugate gradient (RCG).
//!
//! Each new direction combines the negative gradient at the new iterate with
//! the previous direction carried over by vector transport:
//!
//! η_{k+1} = σ_k 𝒯(η_k) − grad f(x_{k+1})
//!
//! # Supported Methods
//!
//! With 𝒯 the transport from x_k to x_{k+1}, g the Riemannian gradients and
//! y = g_{k+1} − 𝒯(g_k):
//!
//! - **Fletcher-Reeves (FR)**: σ = ‖g_{k+1}‖² / ‖g_k‖²
//! - **Polak-Ribière (PR, modified)**: σ = ⟨y, g_{k+1}⟩ / ‖g_k‖², reset to 0
//!   under strong Wolfe when non-positive
//! - **Hestenes-Stiefel (HS)**: σ = ⟨y, g_{k+1}⟩ / ⟨𝒯(η_k), y⟩
//! - **FR-PR hybrid**: σ_PR clamped to [−σ_FR, σ_FR]
//! - **Dai-Yuan (DY)**: σ = ‖g_{k+1}‖² / ⟨𝒯(η_k), y⟩
//! - **Hager-Zhang (HZ)**: σ = ⟨y − 2‖y‖²/⟨y, 𝒯(η_k)⟩ 𝒯(η_k), g_{k+1}⟩ / ⟨y, 𝒯(η_k)⟩
//!
//! The direction is reset to the negative gradient every `restart_period`
//! iterations and whenever it stops being a descent direction.
//!
//! # References
//!
//! - Hager & Zhang, "A survey of nonlinear conjugate gradient methods" (2006)
//! - Ring & Wirth, "Optimization methods on Riemannian manifolds and their
//!   application to shape space" (2012)
//! - Sato & Iwai, "A new, globally convergent Riemannian conjugate gradient method" (2015)

use crate::solver::{integer_param, LineSearchKind, SearchDirectionRule, SolverState};
use rcgopt_core::{
    cost_function::ProblemUsage,
    error::{OptimizerError, OptimizerResult},
    manifold::Manifold,
    types::{DVector, Scalar, TangentVector},
};
use std::collections::HashMap;
use std::fmt;

/// Formula for the conjugacy coefficient σ.
///
/// The numeric codes are the values accepted by `RCGmethod`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RcgMethod {
    /// Code 0
    FletcherReeves,
    /// Code 1
    #[default]
    PolakRibiereMod,
    /// Code 2
    HestenesStiefel,
    /// Code 3
    FrPr,
    /// Code 4
    DaiYuan,
    /// Code 5
    HagerZhang,
}

impl RcgMethod {
    /// All methods in code order.
    pub const ALL: [RcgMethod; 6] = [
        RcgMethod::FletcherReeves,
        RcgMethod::PolakRibiereMod,
        RcgMethod::HestenesStiefel,
        RcgMethod::FrPr,
        RcgMethod::DaiYuan,
        RcgMethod::HagerZhang,
    ];

    /// Decodes a numeric `RCGmethod` value.
    pub fn from_code(code: f64) -> OptimizerResult<Self> {
        let index = integer_param("RCGmethod", code)?;
        Self::ALL.get(index).copied().ok_or_else(|| {
            OptimizerError::invalid_configuration(
                "RCGmethod must be between 0 and 5",
                "RCGmethod",
                code.to_string(),
            )
        })
    }

    /// Numeric code of this method.
    pub fn code(&self) -> usize {
        *self as usize
    }

    /// Upper-case method name used in parameter dumps.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FletcherReeves => "FLETCHER_REEVES",
            Self::PolakRibiereMod => "POLAK_RIBIERE_MOD",
            Self::HestenesStiefel => "HESTENES_STIEFEL",
            Self::FrPr => "FR_PR",
            Self::DaiYuan => "DAI_YUAN",
            Self::HagerZhang => "HAGER_ZHANG",
        }
    }
}

impl fmt::Display for RcgMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration for the RCG direction rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RcgConfig {
    /// Restart every this many iterations (`ManDim`); `usize::MAX` never restarts
    pub restart_period: usize,
    /// Conjugacy formula (`RCGmethod`)
    pub method: RcgMethod,
}

impl Default for RcgConfig {
    fn default() -> Self {
        Self {
            restart_period: usize::MAX,
            method: RcgMethod::default(),
        }
    }
}

impl RcgConfig {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the restart period.
    pub fn with_restart_period(mut self, period: usize) -> Self {
        self.restart_period = period;
        self
    }

    /// Sets the conjugacy formula.
    pub fn with_method(mut self, method: RcgMethod) -> Self {
        self.method = method;
        self
    }

    /// Checks the restart period.
    pub fn validate(&self) -> OptimizerResult<()> {
        if self.restart_period == 0 {
            return Err(OptimizerError::invalid_configuration(
                "ManDim must be at least 1",
                "ManDim",
                "0",
            ));
        }
        Ok(())
    }

    /// Applies `ManDim` and `RCGmethod` from a parameter map.
    ///
    /// Other keys are left to the solver loop. The configuration is unchanged
    /// if any recognized value is invalid.
    pub fn set_params(&mut self, params: &HashMap<String, f64>) -> OptimizerResult<()> {
        let mut updated = *self;
        for (key, &value) in params {
            match key.as_str() {
                "ManDim" => updated.restart_period = integer_param(key, value)?,
                "RCGmethod" => updated.method = RcgMethod::from_code(value)?,
                _ => {}
            }
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Parameter dump.
    pub fn summary(&self) -> HashMap<String, String> {
        let mut summary = HashMap::new();
        summary.insert("ManDim".to_string(), self.restart_period.to_string());
        summary.insert("RCGmethod".to_string(), self.method.name().to_string());
        summary
    }

    fn is_restart_iteration(&self, iteration: usize) -> bool {
        iteration.checked_rem(self.restart_period) == Some(0)
    }
}

impl fmt::Display for RcgConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RCG METHOD PARAMETERS:")?;
        writeln!(f, "ManDim        : {:>15}", self.restart_period)?;
        write!(f, "RCGmethod     : {:>15}", self.method.name())
    }
}

/// Riemannian conjugate gradient direction rule.
///
/// Run it with [`crate::solver::LineSearchSolver`].
#[derive(Debug, Clone)]
pub struct RCG<T: Scalar> {
    config: RcgConfig,
    sigma: T,
    zeta: TangentVector<T>,
    y_diff: Option<TangentVector<T>>,
    restarted: bool,
}

impl<T: Scalar> Default for RCG<T> {
    fn default() -> Self {
        Self::new(RcgConfig::default())
    }
}

impl<T: Scalar> RCG<T> {
    /// Creates the rule with the given configuration.
    pub fn new(config: RcgConfig) -> Self {
        Self {
            config,
            sigma: T::zero(),
            zeta: DVector::zeros(0),
            y_diff: None,
            restarted: false,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RcgConfig {
        &self.config
    }

    /// Applies `ManDim` and `RCGmethod` from a parameter map.
    pub fn set_params(&mut self, params: &HashMap<String, f64>) -> OptimizerResult<()> {
        self.config.set_params(params)
    }

    /// Conjugacy coefficient of the last update.
    pub fn sigma(&self) -> T {
        self.sigma
    }

    /// Transported vector the last update combined with the new gradient.
    pub fn zeta(&self) -> &TangentVector<T> {
        &self.zeta
    }

    /// Gradient difference of the last update, for the methods that use it.
    pub fn y_diff(&self) -> Option<&TangentVector<T>> {
        self.y_diff.as_ref()
    }

    /// Whether the last search direction was reset to the negative gradient.
    pub fn restarted(&self) -> bool {
        self.restarted
    }

    /// Parameter dump.
    pub fn summary(&self) -> HashMap<String, String> {
        let mut summary = self.config.summary();
        summary.insert("name".to_string(), "RCG".to_string());
        summary
    }
}

impl<T: Scalar> fmt::Display for RCG<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.config, f)
    }
}

impl<T: Scalar> SearchDirectionRule<T> for RCG<T> {
    fn name(&self) -> &str {
        "RCG"
    }

    fn usage(&self) -> ProblemUsage {
        ProblemUsage::gradient_only()
    }

    fn check_params(&self) -> OptimizerResult<()> {
        self.config.validate()?;
        tracing::info!(
            solver = "RCG",
            man_dim = self.config.restart_period,
            method = self.config.method.name(),
            "method parameters"
        );
        Ok(())
    }

    fn get_search_dir<M>(&mut self, manifold: &M, state: &mut SolverState<T>) -> OptimizerResult<()>
    where
        M: Manifold<T> + ?Sized,
    {
        let slope = manifold.inner_product(&state.x1, &state.eta1, &state.gf1)?;
        self.restarted = self.config.is_restart_iteration(state.iteration) || slope >= -T::EPSILON;
        if self.restarted {
            state.eta1 = -&state.gf1;
        }
        Ok(())
    }

    fn update_data<M>(&mut self, manifold: &M, state: &mut SolverState<T>) -> OptimizerResult<()>
    where
        M: Manifold<T> + ?Sized,
    {
        if self.config.is_restart_iteration(state.iteration) {
            return Ok(());
        }

        let SolverState {
            x1,
            x2,
            gf1,
            gf2,
            eta1,
            eta2,
            line_search,
            cache,
            ..
        } = state;
        let (x1, x2, gf1, gf2, eta2) = (&*x1, &*x2, &*gf1, &*gf2, &*eta2);
        let mut transport =
            |v: &TangentVector<T>| manifold.vector_transport(x1, eta2, x2, v, cache);

        let gf1_sq = manifold.inner_product(x1, gf1, gf1)?;
        let two = <T as Scalar>::from_f64(2.0);
        let mut y_diff = None;

        let (sigma, zeta) = match self.config.method {
            RcgMethod::FletcherReeves => {
                let sigma = manifold.inner_product(x2, gf2, gf2)? / gf1_sq;
                (sigma, transport(&*eta1)?)
            }
            RcgMethod::PolakRibiereMod => {
                let diff = gf2 - transport(gf1)?;
                let sigma = manifold.inner_product(x2, &diff, gf2)? / gf1_sq;
                if *line_search == LineSearchKind::StrongWolfe && sigma <= T::zero() {
                    (T::zero(), diff)
                } else {
                    (sigma, transport(&*eta1)?)
                }
            }
            RcgMethod::HestenesStiefel => {
                let zeta = transport(&*eta1)?;
                let y = gf2 - transport(gf1)?;
                let sigma = manifold.inner_product(x2, &y, gf2)?
                    / manifold.inner_product(x2, &zeta, &y)?;
                y_diff = Some(y);
                (sigma, zeta)
            }
            RcgMethod::FrPr => {
                let diff = gf2 - transport(gf1)?;
                let sigma_pr = manifold.inner_product(x2, &diff, gf2)? / gf1_sq;
                let sigma_fr = manifold.inner_product(x2, gf2, gf2)? / gf1_sq;
                let sigma = if sigma_pr < -sigma_fr {
                    -sigma_fr
                } else if sigma_pr > sigma_fr {
                    sigma_fr
                } else {
                    sigma_pr
                };
                (sigma, transport(&*eta1)?)
            }
            RcgMethod::DaiYuan => {
                let zeta = transport(&*eta1)?;
                let y = gf2 - transport(gf1)?;
                let sigma = manifold.inner_product(x2, gf2, gf2)?
                    / manifold.inner_product(x2, &zeta, &y)?;
                y_diff = Some(y);
                (sigma, zeta)
            }
            RcgMethod::HagerZhang => {
                let zeta = transport(&*eta1)?;
                let mut y = gf2 - transport(gf1)?;
                let t1 = manifold.inner_product(x2, &y, &zeta)?;
                let t2 = -two * manifold.inner_product(x2, &y, &y)? / t1;
                y.axpy(t2, &zeta, T::one());
                let sigma = manifold.inner_product(x2, &y, gf2)? / t1;
                y_diff = Some(y);
                (sigma, zeta)
            }
        };

        // eta1 = sigma * zeta - gf2
        eta1.copy_from(gf2);
        eta1.axpy(sigma, &zeta, -T::one());

        self.sigma = sigma;
        self.zeta = zeta;
        self.y_diff = y_diff;
        Ok(())
    }

    fn log_iteration(&self, state: &SolverState<T>) {
        tracing::debug!(
            iteration = state.iteration,
            sigma = Scalar::to_f64(self.sigma),
            reset = self.restarted,
            "RCG direction"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgopt_core::test_manifolds::TestEuclideanManifold;

    fn vec2(a: f64, b: f64) -> DVector<f64> {
        DVector::from_vec(vec![a, b])
    }

    /// gf1 = (1, 1), gf2 = (2, 0), previous direction (−2, −1), flat geometry.
    fn state(gf2: DVector<f64>, line_search: LineSearchKind) -> SolverState<f64> {
        let mut state = SolverState::new(vec2(0.0, 0.0), 1.0, vec2(1.0, 1.0), line_search);
        state.x2 = vec2(0.5, 0.5);
        state.gf2 = gf2;
        state.eta1 = vec2(-2.0, -1.0);
        state.eta2 = vec2(0.5, 0.5);
        state.iteration = 1;
        state
    }

    fn update(
        method: RcgMethod,
        gf2: DVector<f64>,
        line_search: LineSearchKind,
    ) -> (f64, DVector<f64>) {
        let manifold = TestEuclideanManifold::new(2);
        let mut rcg = RCG::new(RcgConfig::new().with_method(method));
        let mut state = state(gf2, line_search);
        rcg.update_data(&manifold, &mut state).unwrap();
        (rcg.sigma(), state.eta1)
    }

    #[test]
    fn test_fletcher_reeves() {
        let (sigma, eta) =
            update(RcgMethod::FletcherReeves, vec2(2.0, 0.0), LineSearchKind::StrongWolfe);
        assert_eq!(sigma, 2.0);
        assert_eq!(eta, vec2(-6.0, -2.0));
    }

    #[test]
    fn test_polak_ribiere_mod() {
        let (sigma, eta) =
            update(RcgMethod::PolakRibiereMod, vec2(2.0, 0.0), LineSearchKind::StrongWolfe);
        assert_eq!(sigma, 1.0);
        assert_eq!(eta, vec2(-4.0, -1.0));
    }

    #[test]
    fn test_polak_ribiere_mod_nonpositive_sigma() {
        // y = (−0.5, −1), ⟨y, gf2⟩ = −0.25, sigma = −0.125
        let (sigma, eta) =
            update(RcgMethod::PolakRibiereMod, vec2(0.5, 0.0), LineSearchKind::StrongWolfe);
        assert_eq!(sigma, 0.0);
        assert_eq!(eta, vec2(-0.5, 0.0));

        let (sigma, eta) =
            update(RcgMethod::PolakRibiereMod, vec2(0.5, 0.0), LineSearchKind::Armijo);
        assert_eq!(sigma, -0.125);
        assert_eq!(eta, vec2(-0.25, 0.125));
    }

    #[test]
    fn test_hestenes_stiefel() {
        let (sigma, eta) =
            update(RcgMethod::HestenesStiefel, vec2(2.0, 0.0), LineSearchKind::StrongWolfe);
        assert_eq!(sigma, -2.0);
        assert_eq!(eta, vec2(2.0, 2.0));
    }

    #[test]
    fn test_fr_pr_hybrid() {
        let (sigma, eta) = update(RcgMethod::FrPr, vec2(2.0, 0.0), LineSearchKind::StrongWolfe);
        assert_eq!(sigma, 1.0);
        assert_eq!(eta, vec2(-4.0, -1.0));

        // sigma_PR = 3 is clamped to sigma_FR = 2
        let (sigma, eta) = update(RcgMethod::FrPr, vec2(-2.0, 0.0), LineSearchKind::StrongWolfe);
        assert_eq!(sigma, 2.0);
        assert_eq!(eta, vec2(-2.0, -2.0));
    }

    #[test]
    fn test_dai_yuan() {
        let (sigma, eta) = update(RcgMethod::DaiYuan, vec2(2.0, 0.0), LineSearchKind::StrongWolfe);
        assert_eq!(sigma, -4.0);
        assert_eq!(eta, vec2(6.0, 4.0));
    }

    #[test]
    fn test_hager_zhang() {
        let (sigma, eta) =
            update(RcgMethod::HagerZhang, vec2(2.0, 0.0), LineSearchKind::StrongWolfe);
        assert_eq!(sigma, 14.0);
        assert_eq!(eta, vec2(-30.0, -14.0));
    }

    #[test]
    fn test_restart_every_iteration() {
        let manifold = TestEuclideanManifold::new(2);
        let mut rcg = RCG::new(RcgConfig::new().with_restart_period(1));
        let mut state = state(vec2(2.0, 0.0), LineSearchKind::StrongWolfe);

        rcg.update_data(&manifold, &mut state).unwrap();
        assert_eq!(state.eta1, vec2(-2.0, -1.0));

        for iteration in [1, 2, 7] {
            state.iteration = iteration;
            state.eta1 = vec2(-2.0, -1.0);
            rcg.get_search_dir(&manifold, &mut state).unwrap();
            assert!(rcg.restarted());
            assert_eq!(state.eta1, vec2(-1.0, -1.0));
        }
    }

    #[test]
    fn test_descent_safeguard() {
        let manifold = TestEuclideanManifold::new(2);
        let mut rcg = RCG::<f64>::default();
        let mut state = state(vec2(2.0, 0.0), LineSearchKind::StrongWolfe);

        rcg.get_search_dir(&manifold, &mut state).unwrap();
        assert!(!rcg.restarted());
        assert_eq!(state.eta1, vec2(-2.0, -1.0));

        state.eta1 = vec2(1.0, -0.5);
        rcg.get_search_dir(&manifold, &mut state).unwrap();
        assert!(rcg.restarted());
        assert_eq!(state.eta1, vec2(-1.0, -1.0));

        state.iteration = 0;
        state.eta1 = vec2(-2.0, -1.0);
        rcg.get_search_dir(&manifold, &mut state).unwrap();
        assert!(rcg.restarted());
    }

    #[test]
    fn test_set_params() {
        let mut rcg = RCG::<f64>::default();
        assert_eq!(rcg.config().method, RcgMethod::PolakRibiereMod);
        assert_eq!(rcg.config().restart_period, usize::MAX);

        let params: HashMap<String, f64> = [
            ("ManDim".to_string(), 5.0),
            ("RCGmethod".to_string(), 4.0),
            ("Max_Iteration".to_string(), 10.0),
        ]
        .into_iter()
        .collect();
        rcg.set_params(&params).unwrap();
        assert_eq!(rcg.config().restart_period, 5);
        assert_eq!(rcg.config().method, RcgMethod::DaiYuan);

        for (key, value) in [("RCGmethod", 6.0), ("RCGmethod", 1.5), ("ManDim", 0.0)] {
            let bad: HashMap<String, f64> = [(key.to_string(), value)].into_iter().collect();
            assert!(matches!(
                rcg.set_params(&bad),
                Err(OptimizerError::InvalidConfiguration { .. })
            ));
        }
        assert_eq!(rcg.config().method, RcgMethod::DaiYuan);
    }

    #[test]
    fn test_usage_and_dump() {
        let rcg = RCG::<f64>::new(RcgConfig::new().with_method(RcgMethod::HagerZhang));
        let usage = rcg.usage();
        assert!(usage.use_gradient);
        assert!(!usage.use_hessian);

        let text = rcg.to_string();
        assert!(text.contains("RCG METHOD PARAMETERS:"));
        assert!(text.contains("HAGER_ZHANG"));
        assert_eq!(rcg.summary()["RCGmethod"], "HAGER_ZHANG");
        assert!(rcg.check_params().is_ok());
    }

    #[test]
    fn test_method_codes() {
        for (code, method) in RcgMethod::ALL.iter().enumerate() {
            assert_eq!(RcgMethod::from_code(code as f64).unwrap(), *method);
            assert_eq!(method.code(), code);
        }
    }
}
