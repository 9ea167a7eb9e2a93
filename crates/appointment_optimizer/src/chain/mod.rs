pub mod joint_chain;
