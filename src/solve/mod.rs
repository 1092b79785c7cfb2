mod q_function;
mod softmax;
mod value_iteration;

pub use q_function::q_values;
pub use softmax::softmax_policy;
pub use value_iteration::{Solution, ValueIteration};
