//! Fitting engine: R-factor, two solvers, and the N-D dispatcher.
//!
//! Architecture:
//! ```text
//!  observation array (any rank, spectral axis anywhere)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  layout   │  move spectral axis first, flatten pixels → (n_channels, n_pixels)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐       ┌──────────┐
//!   │   nnls    │  or   │   admm    │  per-pixel weights (≥ 0) + diagnostics
//!   └──────────┘       └──────────┘
//!        │                   │
//!        └───────┬───────────┘
//!                ▼
//!         ┌──────────┐
//!         │ rfactor   │  Σ|residual| / Σ|spectrum| per pixel
//!         └──────────┘
//!                │
//!                ▼
//!   dispatch restores the pixel layout → SpectrumFit
//! ```

pub mod admm;
pub mod dispatch;
pub mod layout;
pub mod model;
pub mod nnls;
pub mod rfactor;
