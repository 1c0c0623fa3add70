//! Parallel assembly of the effective dynamic system.
//!
//! Every element and condition is passed through the scheme, which turns its
//! static contribution into the effective dynamic one, and the result is
//! scattered into the global system. Only free equations (`0..n_free`) are
//! assembled; rows and columns of fixed DOFs are eliminated, so prescribed
//! values must already be imposed on the nodal state.

use crate::dof::DofSet;
use crate::error::{Error, Result};
use crate::model::ModelPart;
use crate::scheme::{LocalSystem, Scheme};
use crate::scratch::ScratchPool;
use crate::sparse::{CsrMatrix, SparseVector, TripletMatrix};
use crate::types::LocalVector;
use rayon::prelude::*;
use std::sync::Mutex;
use tracing::debug;

/// Assembled system ready for solving.
#[derive(Debug, Clone)]
pub struct AssembledSystem {
    /// Effective tangent over the free equations.
    pub lhs: CsrMatrix,
    /// Effective residual over the free equations.
    pub rhs: Vec<f64>,
    /// Number of free equations.
    pub n_equations: usize,
}

struct GlobalSystem {
    lhs: TripletMatrix,
    rhs: SparseVector,
}

fn poisoned<T>(_: T) -> Error {
    Error::Assembly("assembly lock poisoned by a panicking worker".into())
}

fn check_equation_ids(entity_id: usize, ids: &[usize], rhs: &LocalVector) -> Result<()> {
    if ids.len() != rhs.len() {
        return Err(Error::entity(
            entity_id,
            format!(
                "{} equation ids for a local system of size {}",
                ids.len(),
                rhs.len()
            ),
        ));
    }
    Ok(())
}

/// Assemble the effective LHS and RHS of every element and condition.
///
/// # Arguments
///
/// * `scheme` - Time-integration scheme adding the dynamic terms
/// * `model` - Model part with the current trial state
/// * `dofs` - DOF set defining the equation numbering
/// * `pool` - Per-worker scratch storage
pub fn build_and_assemble<S: Scheme + ?Sized>(
    scheme: &S,
    model: &ModelPart,
    dofs: &DofSet,
    pool: &ScratchPool,
) -> Result<AssembledSystem> {
    let n = dofs.equation_system_size();
    let nodes = model.nodes();
    let info = &model.process_info;

    // Local systems rarely exceed 3 nodes x 3 DOFs.
    let nnz_estimate = (model.elements().len() + model.conditions().len()) * 81;
    let global = Mutex::new(GlobalSystem {
        lhs: TripletMatrix::with_capacity(n, n, nnz_estimate),
        rhs: SparseVector::zeros(n),
    });

    model
        .elements()
        .par_iter()
        .chain(model.conditions().par_iter())
        .try_for_each_init(LocalSystem::new, |local, entity| {
            pool.with(|scratch| {
                scheme.calculate_system_contributions(
                    entity.as_ref(),
                    nodes,
                    info,
                    local,
                    scratch,
                )
            })?;
            check_equation_ids(entity.id(), &local.equation_ids, &local.rhs)?;

            let mut global = global.lock().map_err(poisoned)?;
            global.lhs.add_submatrix(&local.equation_ids, &local.lhs)?;
            global.rhs.add_subvector(&local.equation_ids, &local.rhs)
        })?;

    let global = global.into_inner().map_err(poisoned)?;
    let nnz = global.lhs.nnz();
    let lhs = global.lhs.to_csr()?;
    debug!(n_equations = n, triplets = nnz, nnz = lhs.nnz(), "assembled system");

    Ok(AssembledSystem {
        lhs,
        rhs: global.rhs.into_vec(),
        n_equations: n,
    })
}

/// Assemble only the effective RHS (residual).
pub fn assemble_rhs<S: Scheme + ?Sized>(
    scheme: &S,
    model: &ModelPart,
    dofs: &DofSet,
    pool: &ScratchPool,
) -> Result<Vec<f64>> {
    let n = dofs.equation_system_size();
    let nodes = model.nodes();
    let info = &model.process_info;
    let global = Mutex::new(SparseVector::zeros(n));

    model
        .elements()
        .par_iter()
        .chain(model.conditions().par_iter())
        .try_for_each_init(
            || (LocalVector::zeros(0), Vec::new()),
            |(rhs, ids), entity| {
                pool.with(|scratch| {
                    scheme.calculate_rhs_contribution(
                        entity.as_ref(),
                        nodes,
                        info,
                        rhs,
                        ids,
                        scratch,
                    )
                })?;
                check_equation_ids(entity.id(), ids, rhs)?;
                global.lock().map_err(poisoned)?.add_subvector(ids, rhs)
            },
        )?;

    Ok(global.into_inner().map_err(poisoned)?.into_vec())
}
