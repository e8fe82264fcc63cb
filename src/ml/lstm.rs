// ============================================================
// Layer 5 — Masked (Bi)LSTM
// ============================================================
// A step-by-step LSTM that honours the padding mask produced
// by the embedding layer:
//
//   real step    → state updated, hidden state emitted
//   padded step  → state carried over untouched, zeros emitted
//
// Gate layout inside the fused projections is [i, f, g, o]:
//
//   i = σ(x·Wi + h·Ui + bi)      input gate
//   f = σ(x·Wf + h·Uf + bf)      forget gate (bias starts at 1)
//   g = tanh(x·Wg + h·Ug + bg)   candidate cell
//   o = σ(x·Wo + h·Uo + bo)      output gate
//   c' = f ⊙ c + i ⊙ g
//   h' = o ⊙ tanh(c')
//
// BiLstm runs one forward and one independent backward pass
// and concatenates their per-step outputs on the feature axis.
// The backward pass walks t = T-1 … 0 but writes each output
// back at position t, so both halves line up per time step.
//
// Reference: Hochreiter & Schmidhuber (1997)
//            Schuster & Paliwal (1997) Bidirectional RNNs

use burn::{
    module::Param,
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{sigmoid, tanh},
};

#[derive(Config, Debug)]
pub struct MaskedLstmConfig {
    pub d_input:  usize,
    pub d_hidden: usize,
    /// Walk the sequence right-to-left.
    #[config(default = false)]
    pub reverse: bool,
}

impl MaskedLstmConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MaskedLstm<B> {
        let h = self.d_hidden;
        let mut input_gates = LinearConfig::new(self.d_input, 4 * h).init(device);
        let hidden_gates = LinearConfig::new(h, 4 * h).with_bias(false).init(device);

        // Zero bias except the forget gate, which starts open.
        let bias: Vec<f32> = (0..4 * h)
            .map(|k| if (h..2 * h).contains(&k) { 1.0 } else { 0.0 })
            .collect();
        input_gates.bias = Some(Param::from_tensor(Tensor::from_data(
            TensorData::new(bias, [4 * h]),
            device,
        )));

        MaskedLstm { input_gates, hidden_gates, d_hidden: h, reverse: self.reverse }
    }
}

#[derive(Module, Debug)]
pub struct MaskedLstm<B: Backend> {
    pub input_gates:  Linear<B>,
    pub hidden_gates: Linear<B>,
    d_hidden:         usize,
    reverse:          bool,
}

impl<B: Backend> MaskedLstm<B> {
    /// x: `[batch, seq_len, d_input]`, mask: `[batch, seq_len]`
    /// → `[batch, seq_len, d_hidden]`
    pub fn forward(&self, x: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 3> {
        let [batch, seq_len, _] = x.dims();
        let h_dim = self.d_hidden;
        let device = x.device();

        // Input projection for all steps at once: [batch, seq_len, 4h]
        let projected = self.input_gates.forward(x);

        let mut hidden = Tensor::<B, 2>::zeros([batch, h_dim], &device);
        let mut cell = Tensor::<B, 2>::zeros([batch, h_dim], &device);
        let mut outputs: Vec<Option<Tensor<B, 3>>> = vec![None; seq_len];

        let steps: Vec<usize> = if self.reverse {
            (0..seq_len).rev().collect()
        } else {
            (0..seq_len).collect()
        };

        for t in steps {
            let gates = projected
                .clone()
                .slice([0..batch, t..t + 1, 0..4 * h_dim])
                .reshape([batch, 4 * h_dim])
                + self.hidden_gates.forward(hidden.clone());

            let i = sigmoid(gate(&gates, 0, batch, h_dim));
            let f = sigmoid(gate(&gates, 1, batch, h_dim));
            let g = tanh(gate(&gates, 2, batch, h_dim));
            let o = sigmoid(gate(&gates, 3, batch, h_dim));

            let next_cell = f * cell.clone() + i * g;
            let next_hidden = o * tanh(next_cell.clone());

            // [batch, 1] — broadcasts over the hidden axis
            let m = mask.clone().slice([0..batch, t..t + 1]);
            let keep = m.clone().mul_scalar(-1.0).add_scalar(1.0);

            cell = next_cell * m.clone() + cell * keep.clone();
            hidden = next_hidden.clone() * m.clone() + hidden * keep;

            outputs[t] = Some((next_hidden * m).unsqueeze_dim::<3>(1));
        }

        Tensor::cat(outputs.into_iter().flatten().collect(), 1)
    }
}

fn gate<B: Backend>(gates: &Tensor<B, 2>, k: usize, batch: usize, h: usize) -> Tensor<B, 2> {
    gates.clone().slice([0..batch, k * h..(k + 1) * h])
}

#[derive(Config, Debug)]
pub struct BiLstmConfig {
    pub d_input: usize,
    /// Hidden width of the left-to-right pass.
    #[config(default = 128)]
    pub forward_units: usize,
    /// Hidden width of the right-to-left pass.
    #[config(default = 128)]
    pub backward_units: usize,
}

impl BiLstmConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BiLstm<B> {
        BiLstm {
            forward_layer:  MaskedLstmConfig::new(self.d_input, self.forward_units).init(device),
            backward_layer: MaskedLstmConfig::new(self.d_input, self.backward_units)
                .with_reverse(true)
                .init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct BiLstm<B: Backend> {
    pub forward_layer:  MaskedLstm<B>,
    pub backward_layer: MaskedLstm<B>,
}

impl<B: Backend> BiLstm<B> {
    /// Width of each output step (forward + backward).
    pub fn d_output(&self) -> usize {
        self.forward_layer.d_hidden + self.backward_layer.d_hidden
    }

    /// `[batch, seq_len, d_input]` → `[batch, seq_len, forward_units + backward_units]`
    pub fn forward(&self, x: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 3> {
        let fwd = self.forward_layer.forward(x.clone(), mask.clone());
        let bwd = self.backward_layer.forward(x, mask);
        Tensor::cat(vec![fwd, bwd], 2)
    }
}
