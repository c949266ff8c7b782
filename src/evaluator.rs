//! Feed-forward evaluation of compiled genomes.
//!
//! Nodes fire in the layered order held by the genome's [`Network`]. Since
//! genes only run from lower to higher layers, every node has received all of
//! its input by the time it fires. Evaluation reuses the accumulators stored
//! on the nodes and clears them afterwards, so a genome can be fed every frame
//! without allocating beyond the output vector.

use crate::error::{NeatError, Result};
use crate::genome::Genome;
use crate::topology::Network;

impl Genome {
    /// Rebuild the evaluation order and outgoing-edge index.
    ///
    /// Needed after any structural change before [`feed_forward`](Self::feed_forward)
    /// will run. Weight mutation does not invalidate the network.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::UnknownNode`] if a gene references a missing node.
    pub fn compile_network(&mut self) -> Result<()> {
        self.network = Some(Network::compile(&self.nodes, &self.genes)?);
        Ok(())
    }

    /// Run one forward pass and return the output activations.
    ///
    /// The bias node is fed 1.0. Outputs are the nodes directly following the
    /// inputs, each in (0, 1).
    ///
    /// # Errors
    ///
    /// - [`NeatError::InputLengthMismatch`] if `inputs.len()` differs from the
    ///   genome's input count
    /// - [`NeatError::NetworkNotCompiled`] if the structure changed since the
    ///   last [`compile_network`](Self::compile_network)
    pub fn feed_forward(&mut self, inputs: &[f32]) -> Result<Vec<f32>> {
        if inputs.len() != self.inputs {
            return Err(NeatError::InputLengthMismatch {
                expected: self.inputs,
                actual: inputs.len(),
            });
        }
        let bias_idx = self
            .node_index(self.bias_node)
            .ok_or(NeatError::UnknownNode(self.bias_node))?;
        let network = self.network.as_ref().ok_or(NeatError::NetworkNotCompiled)?;

        for (node, &value) in self.nodes.iter_mut().zip(inputs) {
            node.output = value;
        }
        self.nodes[bias_idx].output = 1.0;

        for &idx in network.order() {
            let signal = self.nodes[idx].activate();
            for edge in network.outgoing(idx) {
                let gene = &self.genes[edge.gene];
                if gene.enabled {
                    self.nodes[edge.target].input_sum += gene.weight * signal;
                }
            }
        }

        let outputs = self.nodes[self.inputs..self.inputs + self.outputs]
            .iter()
            .map(|n| n.output)
            .collect();

        for node in &mut self.nodes {
            node.input_sum = 0.0;
        }
        Ok(outputs)
    }

    /// Fixed-size variant of [`feed_forward`](Self::feed_forward) for hosts
    /// with compile-time sensor and decision counts.
    ///
    /// # Errors
    ///
    /// Everything [`feed_forward`](Self::feed_forward) reports, plus
    /// [`NeatError::OutputLengthMismatch`] when `O` differs from the output
    /// count.
    pub fn decide<const I: usize, const O: usize>(
        &mut self,
        sensors: &[f32; I],
    ) -> Result<[f32; O]> {
        if O != self.outputs {
            return Err(NeatError::OutputLengthMismatch {
                expected: self.outputs,
                actual: O,
            });
        }
        let outputs = self.feed_forward(sensors)?;
        let mut decisions = [0.0; O];
        decisions.copy_from_slice(&outputs);
        Ok(decisions)
    }
}
