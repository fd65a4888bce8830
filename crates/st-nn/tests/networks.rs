use ndarray::{ArrayD, Axis, IxDyn};
use st_nn::{
    dense, gru_cell, load_bincode, logsoftmax, randn, relu, rnn, save_json, sequential, Layer,
    Parameterized, PrngKey, ReuseRegistry, Tensor,
};
use std::sync::Arc;
use tempfile::tempdir;

fn batch(rows: usize, cols: usize) -> Tensor {
    ArrayD::from_shape_fn(IxDyn(&[rows, cols]), |idx| ((idx[0] + 2 * idx[1]) % 5) as f32 - 2.0)
}

fn mlp(hidden: usize, classes: usize) -> Arc<Parameterized> {
    sequential([
        Layer::from(dense(hidden).unwrap()),
        Layer::activation(relu),
        Layer::from(dense(classes).unwrap()),
        Layer::activation(logsoftmax),
    ])
    .unwrap()
}

#[test]
fn mlp_produces_log_probabilities() {
    let net = mlp(8, 3);
    let params = net.init(PrngKey::new(0), &[batch(4, 6)]).unwrap();
    let out = net.apply(&params, &[batch(10, 6)]).unwrap();
    assert_eq!(out.shape(), &[10, 3]);
    for row in out.lanes(Axis(1)) {
        let total: f32 = row.iter().map(|v| v.exp()).sum();
        assert!((total - 1.0).abs() < 1e-4);
    }
}

#[test]
fn shared_encoder_keeps_one_copy_of_its_parameters() {
    let encoder = dense(4).unwrap();
    let encoder_params = encoder.init(PrngKey::new(3), &[batch(2, 5)]).unwrap();
    let registry = ReuseRegistry::new().with(&encoder, encoder_params.clone());

    let classifier = sequential([Layer::from(encoder.clone()), Layer::from(dense(2).unwrap())])
        .unwrap();
    let params = classifier
        .init_reusing(PrngKey::new(4), &[batch(2, 5)], &registry)
        .unwrap();
    let layers = params.field("layers").unwrap();
    let first = layers.get(&st_param::IndexPath::root().child(0usize)).unwrap();
    assert_eq!(first, encoder_params.as_tree());

    let autoencoder = sequential([Layer::from(encoder), Layer::activation(relu)]).unwrap();
    let joined = autoencoder.join_params(&registry).unwrap();
    let encoded = autoencoder.apply(&joined, &[batch(3, 5)]).unwrap();
    assert_eq!(encoded.shape(), &[3, 4]);
}

#[test]
fn recurrent_classifier_round_trips_through_disk() {
    let net = sequential([
        Layer::from(rnn(gru_cell(6, randn(0.1)).unwrap(), 6).unwrap()),
        Layer::from(dense(2).unwrap()),
    ])
    .unwrap();
    let xs = ArrayD::from_shape_fn(IxDyn(&[3, 7, 4]), |idx| (idx[1] as f32) * 0.1 - idx[2] as f32 * 0.05);
    let params = net.init(PrngKey::new(17), &[xs.clone()]).unwrap();
    let out = net.apply(&params, &[xs.clone()]).unwrap();
    assert_eq!(out.shape(), &[3, 7, 2]);

    let dir = tempdir().unwrap();
    let json = dir.path().join("rnn.json");
    save_json(&params, &json).unwrap();
    let reloaded = st_nn::load_json(&json).unwrap();
    assert_eq!(net.apply(&reloaded, &[xs.clone()]).unwrap(), out);

    let bin = dir.path().join("rnn.bin");
    st_nn::save_bincode(&params, &bin).unwrap();
    assert_eq!(load_bincode(&bin).unwrap(), params);
}
